//! Tool definitions and execution.

use async_trait::async_trait;
use lodestar_agent::{AgentError, ToolHandler};
use lodestar_models::Tool;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Parameters for the `order_status` tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OrderStatusParams {
    /// Order number as printed on the confirmation email.
    pub order_id: String,
}

/// Looks up the shipping status of an order.
#[derive(Debug, Clone)]
pub struct OrderStatus {
    definition: Tool,
    orders: BTreeMap<String, String>,
}

impl OrderStatus {
    /// Name the model uses to call this tool.
    pub const NAME: &'static str = "order_status";

    /// Creates the tool over a fixed order table.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter schema cannot be serialized.
    pub fn new() -> Result<Self, serde_json::Error> {
        let definition = Tool::from_schema::<OrderStatusParams>(
            Self::NAME,
            "Return the shipping status of an order.",
        )?;
        let orders = [
            ("1042", "shipped on Monday, arriving Thursday"),
            ("1077", "packed, waiting for the carrier"),
            ("1101", "delivered to the front desk"),
        ]
        .into_iter()
        .map(|(id, status)| (id.to_string(), status.to_string()))
        .collect();

        Ok(Self { definition, orders })
    }
}

#[async_trait]
impl ToolHandler for OrderStatus {
    fn definition(&self) -> Tool {
        self.definition.clone()
    }

    async fn call(&self, arguments: &Map<String, Value>) -> Result<String, AgentError> {
        let params: OrderStatusParams = serde_json::from_value(Value::Object(arguments.clone()))
            .map_err(|err| AgentError::tool(format!("invalid params: {err}")))?;

        Ok(match self.orders.get(&params.order_id) {
            Some(status) => format!("Order {} is {status}.", params.order_id),
            None => format!("There is no order {}.", params.order_id),
        })
    }
}
