use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

use super::error::{ToolError, ToolResult};
use super::{optional_string_argument, string_argument, Tool};
use crate::models::tool::{ParameterType, ToolFunction, ToolParameter};

pub const OPENWEATHER_HOST: &str = "https://api.openweathermap.org";

/// Current weather from OpenWeatherMap
pub struct Weather {
    client: Client,
    host: String,
    api_key: String,
    functions: Vec<ToolFunction>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    name: String,
    weather: Vec<Condition>,
    main: Readings,
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct Readings {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

impl Weather {
    pub fn new(api_key: String) -> Self {
        Self::with_host(api_key, OPENWEATHER_HOST.to_string())
    }

    pub fn with_host(api_key: String, host: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            host,
            api_key,
            functions: vec![ToolFunction::new(
                "get_current_weather",
                "Returns current weather for a city",
                vec![
                    ToolParameter::new("city", ParameterType::String, "City name").required(),
                    ToolParameter::new("state_code", ParameterType::String, "State code"),
                    ToolParameter::new(
                        "country_code",
                        ParameterType::String,
                        "Country code (ISO 3166)",
                    ),
                    ToolParameter::new("units", ParameterType::String, "Units for temperature")
                        .with_enum(["imperial", "metric", "standard"]),
                ],
            )],
        }
    }

    async fn current_weather(
        &self,
        location: &str,
        units: &str,
    ) -> ToolResult<CurrentWeather> {
        let url = format!("{}/data/2.5/weather", self.host.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", units),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body: Value = response.json().await.unwrap_or_default();
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(ToolError::ExecutionError(format!(
                "weather lookup failed ({}): {}",
                status, message
            )));
        }
        Ok(response.json().await?)
    }
}

fn temperature_unit(units: &str) -> &'static str {
    match units {
        "imperial" => "°F",
        "metric" => "°C",
        _ => "K",
    }
}

fn speed_unit(units: &str) -> &'static str {
    match units {
        "imperial" => "mph",
        _ => "m/s",
    }
}

#[async_trait]
impl Tool for Weather {
    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Wrapper around OpenWeatherMap API. Useful for getting current weather for a city."
    }

    fn functions(&self) -> &[ToolFunction] {
        &self.functions
    }

    async fn execute(&self, function: &str, arguments: &Map<String, Value>) -> ToolResult<String> {
        if function != "get_current_weather" {
            return Err(ToolError::FunctionNotFound(function.to_string()));
        }
        let city = string_argument(arguments, "city")?;
        let units = optional_string_argument(arguments, "units").unwrap_or("imperial");
        if !["imperial", "metric", "standard"].contains(&units) {
            return Err(ToolError::InvalidParameters(format!(
                "units must be one of imperial, metric, standard, got '{}'",
                units
            )));
        }
        let location = [
            Some(city),
            optional_string_argument(arguments, "state_code"),
            optional_string_argument(arguments, "country_code"),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(",");
        tracing::debug!(location = %location, units, "fetching current weather");

        let current = self.current_weather(&location, units).await?;
        let description = current
            .weather
            .first()
            .map(|c| c.description.as_str())
            .unwrap_or("unknown conditions");
        Ok(format!(
            "The current weather in {} is {} with a temperature of {}{}, humidity of {}% and wind speed of {} {}",
            current.name,
            description,
            current.main.temp,
            temperature_unit(units),
            current.main.humidity,
            current.wind.speed,
            speed_unit(units)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn arguments(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_current_weather() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Boston,MA,US"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "owm_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Boston",
                "weather": [{"main": "Clouds", "description": "broken clouds"}],
                "main": {"temp": 12.5, "humidity": 71},
                "wind": {"speed": 4.1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let weather = Weather::with_host("owm_key".to_string(), server.uri());
        let result = weather
            .execute(
                "get_current_weather",
                &arguments(json!({
                    "city": "Boston",
                    "state_code": "MA",
                    "country_code": "US",
                    "units": "metric"
                })),
            )
            .await
            .unwrap();

        assert_eq!(
            result,
            "The current weather in Boston is broken clouds with a temperature of 12.5°C, humidity of 71% and wind speed of 4.1 m/s"
        );
    }

    #[tokio::test]
    async fn test_city_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"cod": "404", "message": "city not found"})),
            )
            .mount(&server)
            .await;

        let weather = Weather::with_host("owm_key".to_string(), server.uri());
        let err = weather
            .execute("get_current_weather", &arguments(json!({"city": "Atlantis"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("city not found"));
    }

    #[tokio::test]
    async fn test_rejects_unknown_units() {
        let weather = Weather::new("owm_key".to_string());
        let err = weather
            .execute(
                "get_current_weather",
                &arguments(json!({"city": "Boston", "units": "kelvin"})),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }
}
