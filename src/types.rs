// src/types.rs
use crate::drivers::{Analysis, SampleBatch};

// 调用方发给工作线程的命令
#[derive(Clone, Debug)]
pub enum EngineCommand {
    Ingest(SampleBatch),
    Reset(String),
    Shutdown,
}

// 工作线程发回的消息
#[derive(Clone, Debug)]
pub enum EngineMessage {
    Analysis(Analysis),
    DeviceReset { device_id: String, existed: bool },
    Stopped,
}
