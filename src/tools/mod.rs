//! 工具箱：注册表与各领域工具（裁员数据、新闻、网页/Google 搜索、薪资、文档、分析）

pub mod analysis;
pub mod documents;
pub mod google_search;
pub mod layoffs;
pub mod news;
pub mod registry;
pub mod salary;
pub mod web_search;

pub use analysis::{AnalyzeJobDescriptionTool, AnalyzeResumeTool, CandidateFitTool};
pub use documents::DocumentRetrievalTool;
pub use google_search::GoogleSearchTool;
pub use layoffs::{LayoffFieldValuesTool, RecentLayoffsTool};
pub use news::CompanyNewsTool;
pub use registry::{Tool, ToolRegistry, ToolResult};
pub use salary::SalaryLookupTool;
pub use web_search::WebSearchTool;
