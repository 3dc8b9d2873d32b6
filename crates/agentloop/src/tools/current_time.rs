use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;

use super::Tool;
use crate::errors::AgentResult;
use crate::models::tool::{ParameterType, ToolDescriptor, ToolParameter};

/// Reports the current date and time, optionally in a named timezone
pub struct CurrentTimeTool {
    descriptor: ToolDescriptor,
}

impl Default for CurrentTimeTool {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrentTimeTool {
    pub const NAME: &'static str = "get_current_time";

    pub fn new() -> Self {
        let descriptor = ToolDescriptor::new(
            Self::NAME,
            "Get the current date and time in ISO format",
        )
        .with_parameter(
            ToolParameter::new("timezone", ParameterType::String)
                .with_description("Timezone name (e.g., 'UTC', 'Europe/Moscow')"),
        );

        Self { descriptor }
    }
}

/// Render `now` in the given IANA zone; unknown zones fall back to UTC
fn format_in_zone(now: DateTime<Utc>, timezone: Option<&str>) -> String {
    match timezone.map(str::parse::<Tz>) {
        Some(Ok(tz)) => now.with_timezone(&tz).to_rfc3339(),
        Some(Err(_)) => {
            tracing::debug!(timezone = ?timezone, "unknown timezone, using UTC");
            now.to_rfc3339()
        }
        None => now.to_rfc3339(),
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn call(&self, arguments: &Value) -> AgentResult<String> {
        let timezone = arguments.get("timezone").and_then(Value::as_str);
        Ok(format_in_zone(Utc::now(), timezone))
    }
}
