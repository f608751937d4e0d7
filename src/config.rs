use serde::{Deserialize, Serialize};

const DEFAULT_TICK_INTERVAL_MS: u32 = 1_000;
const DEFAULT_REVEAL_DELAY_MS: u32 = 1_000;

/// 会话配置，前端可传入 JSON 覆盖其中任意字段。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// 计时器间隔，每次触发 `elapsed_seconds` 加一。
    pub tick_interval_ms: u32,
    /// 未配对时两张牌保持翻开的时长。
    pub reveal_delay_ms: u32,
    /// 内置图片所在的站点路径前缀。
    pub base_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            reveal_delay_ms: DEFAULT_REVEAL_DELAY_MS,
            base_path: String::new(),
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }
}
