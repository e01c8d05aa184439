//! `calculate` tool

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::tools::NativeTool;
use crate::tools::expr::{evaluate, format_number};

/// Evaluates arithmetic expressions such as `2 + 2` or `sqrt(144)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Calculator;

impl Calculator {
    /// `"{expr} = {result}"`, or `"Error: {reason}"` when evaluation fails.
    pub fn run(expression: &str) -> String {
        let expr = expression.trim();
        match evaluate(expr) {
            Ok(value) => format!("{expr} = {}", format_number(value)),
            Err(e) => format!("Error: {e}"),
        }
    }
}

#[async_trait]
impl NativeTool for Calculator {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate a math expression like \"2 + 2\" or \"sqrt(144)\". Supports + - * / % **, \
         parentheses, pi, e, sqrt, sin, cos, tan, log, log10, exp, abs, round, pow, min and max."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Math expression like \"2 + 2\" or \"sqrt(144)\""
                }
            },
            "required": ["expression"]
        })
    }

    async fn call(&self, args: Value) -> anyhow::Result<Value> {
        let expression = args
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("missing string argument 'expression'"))?;
        Ok(Value::String(Self::run(expression)))
    }
}
