//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `SCOUT__*` 覆盖（双下划线表示嵌套，如 `SCOUT__LLM__MODEL=gpt-4o`）。
//! 各外部 API 的密钥不进配置文件，由工具自身从环境变量读取。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub tools: ToolsSection,
}

/// [app] 段：应用名与系统提示词
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 每个会话播种的 system 提示词，{date} 在建会话时替换为当天日期
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_system_prompt() -> String {
    "You are a helpful career intelligence assistant. Today's date is {date}. \
     Use the available tools to answer questions about layoffs, salaries, company news \
     and candidate-job fit. Never invent data a tool did not return."
        .to_string()
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI 兼容端点；未设置时用官方地址
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// [gateway] 段：监听地址、连接上限、工具递归深度
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySection {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// 单轮内连续工具调用趟数上限
    #[serde(default = "default_max_tool_depth")]
    pub max_tool_depth: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_connections: default_max_connections(),
            max_tool_depth: default_max_tool_depth(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8100".to_string()
}

fn default_max_connections() -> usize {
    1000
}

fn default_max_tool_depth() -> usize {
    5
}

/// [tools] 段：工具超时与各外部 API 端点
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    /// 工具内部 HTTP 请求超时（秒）
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_news_api_base")]
    pub news_api_base: String,
    #[serde(default = "default_web_search_api_base")]
    pub web_search_api_base: String,
    #[serde(default = "default_google_search_api_base")]
    pub google_search_api_base: String,
    /// Custom Search Engine 标识
    #[serde(default = "default_google_search_cx")]
    pub google_search_cx: String,
    #[serde(default = "default_salary_api_base")]
    pub salary_api_base: String,
    #[serde(default = "default_salary_location_api_base")]
    pub salary_location_api_base: String,
    #[serde(default = "default_salary_api_host")]
    pub salary_api_host: String,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            news_api_base: default_news_api_base(),
            web_search_api_base: default_web_search_api_base(),
            google_search_api_base: default_google_search_api_base(),
            google_search_cx: default_google_search_cx(),
            salary_api_base: default_salary_api_base(),
            salary_location_api_base: default_salary_location_api_base(),
            salary_api_host: default_salary_api_host(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    30
}

fn default_http_timeout_secs() -> u64 {
    15
}

fn default_news_api_base() -> String {
    "https://newsapi.org/v2/everything".to_string()
}

fn default_web_search_api_base() -> String {
    "https://api.langsearch.com/v1/web-search".to_string()
}

fn default_google_search_api_base() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

fn default_google_search_cx() -> String {
    "c1f537542c3dd499a".to_string()
}

fn default_salary_api_base() -> String {
    "https://real-time-glassdoor-data.p.rapidapi.com/salaries".to_string()
}

fn default_salary_location_api_base() -> String {
    "https://real-time-glassdoor-data.p.rapidapi.com/locations".to_string()
}

fn default_salary_api_host() -> String {
    "real-time-glassdoor-data.p.rapidapi.com".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            gateway: GatewaySection::default(),
            tools: ToolsSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 SCOUT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 SCOUT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SCOUT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
