//! A calculator service over TCP.
//!
//! Run the server, then exercise it with a client in the same process:
//!
//! ```text
//! cargo run --example calculator
//! ```

use crimp_client::{Client, ClientConfig, TCall};
use crimp_pinch::{pinch_enum, PinchError, Pinchable, StructBuilder, StructParser};
use crimp_protocol::{TType, Value};
use crimp_server::{HandlerError, Server, ServerConfig, TcpServer};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pinch_enum! {
    pub enum CalcOp {
        Plus = 1,
        Minus = 2,
        Div = 3,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CalcRequest {
    pub left: i32,
    pub right: i32,
    pub op: CalcOp,
}

impl Pinchable for CalcRequest {
    fn ttype() -> TType {
        TType::Struct
    }

    fn pinch(&self) -> Value {
        StructBuilder::new()
            .field(1, &self.left)
            .field(2, &self.right)
            .field(3, &self.op)
            .build()
    }

    fn unpinch(value: &Value) -> Result<Self, PinchError> {
        let p = StructParser::new("CalcRequest", value)?;
        Ok(Self {
            left: p.field(1)?,
            right: p.field(2)?,
            op: p.field(3)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CalcResult {
    pub result: Option<i32>,
    pub error: Option<String>,
}

impl Pinchable for CalcResult {
    fn ttype() -> TType {
        TType::Struct
    }

    fn pinch(&self) -> Value {
        StructBuilder::new()
            .optional(1, self.result.as_ref())
            .optional(2, self.error.as_ref())
            .build()
    }

    fn unpinch(value: &Value) -> Result<Self, PinchError> {
        let p = StructParser::new("CalcResult", value)?;
        Ok(Self {
            result: p.optional(1)?,
            error: p.optional(2)?,
        })
    }
}

fn calc_server() -> Server {
    Server::builder()
        .handler("calc", |_ctx, msg| {
            let req =
                CalcRequest::unpinch(&msg.payload).map_err(|e| HandlerError::new(e.to_string()))?;
            let result = match req.op {
                CalcOp::Plus => CalcResult {
                    result: Some(req.left + req.right),
                    error: None,
                },
                CalcOp::Minus => CalcResult {
                    result: Some(req.left - req.right),
                    error: None,
                },
                CalcOp::Div if req.right == 0 => CalcResult {
                    result: None,
                    error: Some("div by zero".to_string()),
                },
                CalcOp::Div => CalcResult {
                    result: Some(req.left / req.right),
                    error: None,
                },
            };
            Ok(result.pinch())
        })
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9090".to_string())
        .parse()?;

    let tcp = Arc::new(TcpServer::new(ServerConfig::new(bind_addr), calc_server()));

    let running = tcp.clone();
    let server_handle = tokio::spawn(async move { running.run().await });

    // Give the listener a moment to bind, then demonstrate a few calls.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let mut client = Client::connect(bind_addr, ClientConfig::new()).await?;
    for (left, right, op) in [
        (10, 20, CalcOp::Plus),
        (10, 20, CalcOp::Minus),
        (20, 10, CalcOp::Div),
        (10, 0, CalcOp::Div),
    ] {
        let request = CalcRequest { left, right, op };
        let reply = client.call(TCall::new("calc", request.pinch())).await?;
        let result = CalcResult::unpinch(&reply)?;
        match (result.result, result.error) {
            (Some(n), _) => tracing::info!("{left} {op:?} {right} = {n}"),
            (None, Some(e)) => tracing::info!("{left} {op:?} {right} failed: {e}"),
            (None, None) => tracing::warn!("empty result"),
        }
    }
    client.close().await?;

    tracing::info!("press ctrl-c to stop the server");
    tokio::signal::ctrl_c().await?;
    tcp.shutdown();
    let _ = server_handle.await?;

    Ok(())
}
