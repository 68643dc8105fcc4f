//! 配置解析模块
//!
//! TOML 为主，JSON 可选。解析错误统一为单行消息并附带行列位置，
//! 便于在 `validate` 命令输出中直接定位。

use std::fmt;
use std::path::Path;

use contracts::{ContractError, IngestConfig};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式 (大小写不敏感)
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    /// 从路径推断格式
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!(
                "cannot determine config format of {}",
                path.display()
            ))
        })?;
        Self::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toml => write!(f, "TOML"),
            Self::Json => write!(f, "JSON"),
        }
    }
}

/// 解析位置 (1 起始)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Location {
    line: usize,
    column: usize,
}

impl Location {
    /// 将字节偏移换算为行列
    fn from_offset(content: &str, offset: usize) -> Self {
        let prefix = content.get(..offset).unwrap_or(content);
        let line = prefix.matches('\n').count() + 1;
        let column = match prefix.rfind('\n') {
            Some(nl) => prefix[nl + 1..].chars().count() + 1,
            None => prefix.chars().count() + 1,
        };
        Self { line, column }
    }
}

/// 根据格式解析配置
///
/// 忽略开头的 UTF-8 BOM (Windows 编辑器常见)。
pub fn parse(content: &str, format: ConfigFormat) -> Result<IngestConfig, ContractError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| {
            let location = e.span().map(|span| Location::from_offset(content, span.start));
            let message = e.message().trim().to_string();
            parse_error(format, location, &message, e)
        }),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| {
            let location = (e.line() > 0).then(|| Location {
                line: e.line(),
                column: e.column(),
            });
            let message = e.to_string();
            // serde_json 的消息已带 "at line X column Y" 后缀
            let message = message
                .rsplit_once(" at line ")
                .map_or(message.as_str(), |(head, _)| head)
                .to_string();
            parse_error(format, location, &message, e)
        }),
    }
}

fn parse_error<E>(
    format: ConfigFormat,
    location: Option<Location>,
    message: &str,
    source: E,
) -> ContractError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = match location {
        Some(at) => format!(
            "{format} parse error at line {}, column {}: {message}",
            at.line, at.column
        ),
        None => format!("{format} parse error: {message}"),
    };
    ContractError::ConfigParse {
        message,
        source: Some(Box::new(source)),
    }
}
