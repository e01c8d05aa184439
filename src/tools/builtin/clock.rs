//! `get_time` tool

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};
use serde_json::{Value, json};

use crate::tools::NativeTool;

/// Reports the local date and time.
#[derive(Debug, Default, Clone, Copy)]
pub struct Clock {
    /// Append the weekday, e.g. `2026-02-03 10:15:00 (Tuesday)`.
    pub with_weekday: bool,
}

impl Clock {
    pub fn with_weekday() -> Self {
        Self { with_weekday: true }
    }

    pub fn render<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        if self.with_weekday {
            now.format("%Y-%m-%d %H:%M:%S (%A)").to_string()
        } else {
            format!("Current time: {}", now.format("%Y-%m-%d %H:%M:%S"))
        }
    }
}

#[async_trait]
impl NativeTool for Clock {
    fn name(&self) -> &str {
        "get_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time"
    }

    fn schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _args: Value) -> anyhow::Result<Value> {
        Ok(Value::String(self.render(&Local::now())))
    }
}
