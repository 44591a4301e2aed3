//! User facing prompt templates with `{var}` placeholders
//!
//! Templates declare their input variables up front and construction fails unless the
//! placeholders in the text are exactly that set. `{{` and `}}` render as literal braces.
//! Templates can be stored as JSON or YAML files with a `_type` of `prompt` or `few_shot`.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error(
        "Template variables do not match input variables. Missing from template: [{}], not declared: [{}]",
        .missing.join(", "),
        .undeclared.join(", ")
    )]
    VariableMismatch {
        missing: Vec<String>,
        undeclared: Vec<String>,
    },

    #[error("Missing value for input variable '{0}'")]
    MissingVariable(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Unsupported prompt file extension: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type PromptResult<T> = Result<T, PromptError>;

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// Split a template into literal text and `{var}` placeholders
fn parse(template: &str) -> PromptResult<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(PromptError::InvalidTemplate(format!(
                                "unclosed placeholder '{{{}'",
                                name
                            )))
                        }
                        Some(other) => name.push(other),
                    }
                }
                let name = name.trim();
                if name.is_empty() {
                    return Err(PromptError::InvalidTemplate(
                        "empty placeholder '{}'".to_string(),
                    ));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Variable(name.to_string()));
            }
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// The distinct placeholder names of a template, sorted
pub fn extract_variables(template: &str) -> PromptResult<Vec<String>> {
    let names: BTreeSet<String> = parse(template)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Variable(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect();
    Ok(names.into_iter().collect())
}

fn check_variables(found: &[String], declared: &[String]) -> PromptResult<()> {
    let found: BTreeSet<&String> = found.iter().collect();
    let declared: BTreeSet<&String> = declared.iter().collect();
    if found == declared {
        return Ok(());
    }
    Err(PromptError::VariableMismatch {
        missing: declared.difference(&found).map(|s| s.to_string()).collect(),
        undeclared: found.difference(&declared).map(|s| s.to_string()).collect(),
    })
}

fn render(segments: &[Segment], values: &HashMap<String, String>) -> PromptResult<String> {
    let mut output = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => output.push_str(text),
            Segment::Variable(name) => output.push_str(
                values
                    .get(name)
                    .ok_or_else(|| PromptError::MissingVariable(name.clone()))?,
            ),
        }
    }
    Ok(output)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
    input_variables: Vec<String>,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Build a template, failing unless its placeholders are exactly `input_variables`
    pub fn new<T, I, S>(template: T, input_variables: I) -> PromptResult<Self>
    where
        T: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let template = template.into();
        let input_variables: Vec<String> = input_variables.into_iter().map(Into::into).collect();
        let segments = parse(&template)?;
        check_variables(&extract_variables(&template)?, &input_variables)?;
        Ok(Self {
            template,
            input_variables,
            segments,
        })
    }

    /// Build a template declaring whatever placeholders it contains
    pub fn from_template<T: Into<String>>(template: T) -> PromptResult<Self> {
        let template = template.into();
        let input_variables = extract_variables(&template)?;
        Self::new(template, input_variables)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    pub fn format(&self, values: &HashMap<String, String>) -> PromptResult<String> {
        render(&self.segments, values)
    }

    /// Write the template as JSON or YAML, chosen by the file extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> PromptResult<()> {
        write_prompt_file(path.as_ref(), &PromptFile::from(self))
    }
}

/// A prompt made of a prefix, rendered examples and a suffix
#[derive(Debug, Clone, PartialEq)]
pub struct FewShotPromptTemplate {
    prefix: String,
    suffix: String,
    examples: Vec<HashMap<String, String>>,
    example_prompt: PromptTemplate,
    example_separator: String,
    input_variables: Vec<String>,
}

pub const DEFAULT_EXAMPLE_SEPARATOR: &str = "\n\n";

impl FewShotPromptTemplate {
    pub fn new<I, S>(
        prefix: impl Into<String>,
        suffix: impl Into<String>,
        examples: Vec<HashMap<String, String>>,
        example_prompt: PromptTemplate,
        input_variables: I,
    ) -> PromptResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefix = prefix.into();
        let suffix = suffix.into();
        let input_variables: Vec<String> = input_variables.into_iter().map(Into::into).collect();

        let mut found = extract_variables(&prefix)?;
        found.extend(extract_variables(&suffix)?);
        found.sort();
        found.dedup();
        check_variables(&found, &input_variables)?;

        Ok(Self {
            prefix,
            suffix,
            examples,
            example_prompt,
            example_separator: DEFAULT_EXAMPLE_SEPARATOR.to_string(),
            input_variables,
        })
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.example_separator = separator.into();
        self
    }

    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    pub fn format(&self, values: &HashMap<String, String>) -> PromptResult<String> {
        let mut pieces = Vec::with_capacity(self.examples.len() + 2);
        if !self.prefix.is_empty() {
            pieces.push(render(&parse(&self.prefix)?, values)?);
        }
        for example in &self.examples {
            pieces.push(self.example_prompt.format(example)?);
        }
        pieces.push(render(&parse(&self.suffix)?, values)?);
        Ok(pieces.join(&self.example_separator))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> PromptResult<()> {
        write_prompt_file(path.as_ref(), &PromptFile::from(self))
    }
}

/// A prompt read from disk
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    Template(PromptTemplate),
    FewShot(FewShotPromptTemplate),
}

impl Prompt {
    pub fn format(&self, values: &HashMap<String, String>) -> PromptResult<String> {
        match self {
            Prompt::Template(prompt) => prompt.format(values),
            Prompt::FewShot(prompt) => prompt.format(values),
        }
    }

    pub fn input_variables(&self) -> &[String] {
        match self {
            Prompt::Template(prompt) => prompt.input_variables(),
            Prompt::FewShot(prompt) => prompt.input_variables(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_type", rename_all = "snake_case")]
enum PromptFile {
    Prompt(TemplateSpec),
    FewShot {
        #[serde(default)]
        prefix: String,
        suffix: String,
        examples: ExamplesSource,
        example_prompt: TemplateSpec,
        #[serde(default = "default_separator")]
        example_separator: String,
        input_variables: Vec<String>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct TemplateSpec {
    template: String,
    input_variables: Vec<String>,
}

/// Examples are listed inline or kept in a separate JSON/YAML file
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ExamplesSource {
    Inline(Vec<HashMap<String, String>>),
    File(String),
}

fn default_separator() -> String {
    DEFAULT_EXAMPLE_SEPARATOR.to_string()
}

impl From<&PromptTemplate> for TemplateSpec {
    fn from(prompt: &PromptTemplate) -> Self {
        TemplateSpec {
            template: prompt.template.clone(),
            input_variables: prompt.input_variables.clone(),
        }
    }
}

impl From<&PromptTemplate> for PromptFile {
    fn from(prompt: &PromptTemplate) -> Self {
        PromptFile::Prompt(prompt.into())
    }
}

impl From<&FewShotPromptTemplate> for PromptFile {
    fn from(prompt: &FewShotPromptTemplate) -> Self {
        PromptFile::FewShot {
            prefix: prompt.prefix.clone(),
            suffix: prompt.suffix.clone(),
            examples: ExamplesSource::Inline(prompt.examples.clone()),
            example_prompt: (&prompt.example_prompt).into(),
            example_separator: prompt.example_separator.clone(),
            input_variables: prompt.input_variables.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FileFormat {
    Json,
    Yaml,
}

fn file_format(path: &Path) -> PromptResult<FileFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(FileFormat::Json),
        Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
        other => Err(PromptError::UnsupportedFormat(
            other.unwrap_or_default().to_string(),
        )),
    }
}

fn read_file<T: for<'de> Deserialize<'de>>(path: &Path) -> PromptResult<T> {
    let format = file_format(path)?;
    let content = fs::read_to_string(path)?;
    Ok(match format {
        FileFormat::Json => serde_json::from_str(&content)?,
        FileFormat::Yaml => serde_yaml::from_str(&content)?,
    })
}

fn write_prompt_file(path: &Path, prompt: &PromptFile) -> PromptResult<()> {
    let content = match file_format(path)? {
        FileFormat::Json => serde_json::to_string_pretty(prompt)?,
        FileFormat::Yaml => serde_yaml::to_string(prompt)?,
    };
    fs::write(path, content)?;
    Ok(())
}

/// Load a prompt from a `.json`, `.yaml` or `.yml` file
pub fn load_from_path<P: AsRef<Path>>(path: P) -> PromptResult<Prompt> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading prompt");

    match read_file::<PromptFile>(path)? {
        PromptFile::Prompt(spec) => Ok(Prompt::Template(PromptTemplate::new(
            spec.template,
            spec.input_variables,
        )?)),
        PromptFile::FewShot {
            prefix,
            suffix,
            examples,
            example_prompt,
            example_separator,
            input_variables,
        } => {
            let examples = match examples {
                ExamplesSource::Inline(examples) => examples,
                ExamplesSource::File(file) => {
                    let base = path.parent().unwrap_or_else(|| Path::new("."));
                    read_file(&base.join(file))?
                }
            };
            let example_prompt =
                PromptTemplate::new(example_prompt.template, example_prompt.input_variables)?;
            Ok(Prompt::FewShot(
                FewShotPromptTemplate::new(
                    prefix,
                    suffix,
                    examples,
                    example_prompt,
                    input_variables,
                )?
                .with_separator(example_separator),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_format() {
        let prompt = PromptTemplate::new(
            "Tell me a {adjective} joke about {content}.",
            ["adjective", "content"],
        )
        .unwrap();
        let text = prompt
            .format(&values(&[("adjective", "funny"), ("content", "chickens")]))
            .unwrap();
        assert_eq!(text, "Tell me a funny joke about chickens.");
    }

    #[test]
    fn test_variables_must_match_declared_set() {
        let err = PromptTemplate::new("Tell me a {adjective} joke.", ["adjective", "content"])
            .unwrap_err();
        match err {
            PromptError::VariableMismatch { missing, undeclared } => {
                assert_eq!(missing, vec!["content"]);
                assert!(undeclared.is_empty());
            }
            other => panic!("Expected VariableMismatch, got {:?}", other),
        }

        let err = PromptTemplate::new("Tell me a {adjective} joke.", Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(err, PromptError::VariableMismatch { .. }));
    }

    #[test]
    fn test_double_braces_are_literal() {
        let prompt = PromptTemplate::from_template("Return {{\"answer\": {answer}}}").unwrap();
        assert_eq!(prompt.input_variables(), &["answer".to_string()]);
        assert_eq!(
            prompt.format(&values(&[("answer", "42")])).unwrap(),
            "Return {\"answer\": 42}"
        );
    }

    #[test]
    fn test_format_leaves_no_declared_placeholders() {
        let prompt = PromptTemplate::from_template("{a} and {b} and {a} again").unwrap();
        let text = prompt.format(&values(&[("a", "x"), ("b", "y")])).unwrap();
        assert_eq!(text, "x and y and x again");
        assert!(extract_variables(&text).unwrap().is_empty());
    }

    #[test]
    fn test_missing_value() {
        let prompt = PromptTemplate::from_template("Hello {name}").unwrap();
        assert!(matches!(
            prompt.format(&HashMap::new()),
            Err(PromptError::MissingVariable(name)) if name == "name"
        ));
    }

    #[test]
    fn test_unclosed_placeholder() {
        assert!(matches!(
            PromptTemplate::from_template("Hello {name"),
            Err(PromptError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_few_shot_format() {
        let example_prompt =
            PromptTemplate::new("Input: {input}\nOutput: {output}", ["input", "output"]).unwrap();
        let prompt = FewShotPromptTemplate::new(
            "Give the antonym of every input",
            "Input: {adjective}\nOutput:",
            vec![
                values(&[("input", "happy"), ("output", "sad")]),
                values(&[("input", "tall"), ("output", "short")]),
            ],
            example_prompt,
            ["adjective"],
        )
        .unwrap();

        let text = prompt.format(&values(&[("adjective", "good")])).unwrap();
        assert_eq!(
            text,
            "Give the antonym of every input\n\nInput: happy\nOutput: sad\n\nInput: tall\nOutput: short\n\nInput: good\nOutput:"
        );
    }

    #[test]
    fn test_save_and_load_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("prompt.json");

        let prompt = PromptTemplate::new("Tell me a {adjective} joke.", ["adjective"]).unwrap();
        prompt.save(&path).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["_type"], "prompt");

        let loaded = load_from_path(&path).unwrap();
        assert_eq!(loaded, Prompt::Template(prompt));
    }

    #[test]
    fn test_load_few_shot_yaml_with_examples_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join("examples.json"),
            r#"[{"input": "happy", "output": "sad"}]"#,
        )
        .unwrap();
        let path = temp_dir.path().join("few_shot.yaml");
        fs::write(
            &path,
            indoc::indoc! {r#"
                _type: few_shot
                prefix: "Write antonyms for the following words."
                suffix: "Input: {adjective}\nOutput:"
                examples: examples.json
                example_prompt:
                  _type: prompt
                  template: "Input: {input}\nOutput: {output}"
                  input_variables: [input, output]
                input_variables: [adjective]
            "#},
        )
        .unwrap();

        let prompt = load_from_path(&path).unwrap();
        assert!(matches!(prompt, Prompt::FewShot(_)));
        assert_eq!(prompt.input_variables(), &["adjective".to_string()]);
        let text = prompt.format(&values(&[("adjective", "big")])).unwrap();
        assert!(text.contains("Input: happy\nOutput: sad"));
        assert!(text.ends_with("Input: big\nOutput:"));
    }

    #[test]
    fn test_load_rejects_mismatched_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bad.yml");
        fs::write(
            &path,
            "_type: prompt\ntemplate: \"Hi {name}\"\ninput_variables: [other]\n",
        )
        .unwrap();
        assert!(matches!(
            load_from_path(&path),
            Err(PromptError::VariableMismatch { .. })
        ));

        assert!(matches!(
            load_from_path(temp_dir.path().join("prompt.txt")),
            Err(PromptError::UnsupportedFormat(_))
        ));
    }
}
