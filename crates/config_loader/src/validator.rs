//! 配置校验模块
//!
//! 校验规则：
//! - 字段级约束 (derive `Validate`)：processor.name 非空、timeout_ms > 0
//! - context 的 key 非空，且不得覆盖保留键 (`x-api-key` / `ContainerName`)
//! - network processor 必须提供合法的 `addr`
//! - 数值型参数必须可解析

use std::net::SocketAddr;

use ::validator::Validate;
use contracts::{
    ContractError, IngestConfig, ProcessorConfig, ProcessorType, API_KEY_HEADER,
    CONTAINER_NAME_KEY,
};

/// 校验 IngestConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &IngestConfig) -> Result<(), ContractError> {
    validate_schema(config)?;
    validate_context_keys(config)?;
    validate_processor_params(&config.processor)?;
    Ok(())
}

/// 字段级约束
fn validate_schema(config: &IngestConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("schema", e.to_string()))
}

/// 校验附加 context 键
fn validate_context_keys(config: &IngestConfig) -> Result<(), ContractError> {
    for key in config.context.keys() {
        if key.trim().is_empty() {
            return Err(ContractError::config_validation(
                "context",
                "context key cannot be empty",
            ));
        }
        if key.eq_ignore_ascii_case(API_KEY_HEADER) || key == CONTAINER_NAME_KEY {
            return Err(ContractError::config_validation(
                format!("context.{key}"),
                "reserved key cannot be overridden",
            ));
        }
    }
    Ok(())
}

/// 校验 processor 参数
fn validate_processor_params(processor: &ProcessorConfig) -> Result<(), ContractError> {
    if processor.processor_type == ProcessorType::Network {
        let addr = processor.params.get("addr").ok_or_else(|| {
            ContractError::config_validation(
                "processor.params.addr",
                "network processor requires 'addr'",
            )
        })?;
        addr.parse::<SocketAddr>().map_err(|e| {
            ContractError::config_validation(
                "processor.params.addr",
                format!("invalid address '{addr}': {e}"),
            )
        })?;
    }

    for numeric in ["max_payload_bytes", "connect_timeout_ms"] {
        if let Some(value) = processor.params.get(numeric) {
            value.parse::<u64>().map_err(|_| {
                ContractError::config_validation(
                    format!("processor.params.{numeric}"),
                    format!("expected an unsigned integer, got '{value}'"),
                )
            })?;
        }
    }

    Ok(())
}
