//! 分析工具：JD 解析、简历证据抽取、候选人匹配评分
//!
//! 三个工具都走同一个非流式 LlmClient：结构化提示词 → complete → 从回复中
//! 提取首个 JSON 对象。模型偶尔会包一层客套话或代码块，所以按首个 '{' 与
//! 末个 '}' 截取再解析；提取失败返回结构化错误载荷而不是中断对话。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::conversation::Message;
use crate::llm::LlmClient;
use crate::tools::Tool;

const ANALYSIS_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that provides structured JSON responses.";

const JD_PROMPT: &str = r#"You are the Job Description Standardization Engine. Convert the job description below into a strictly controlled JSON dataset. Extract only what is explicitly stated; never infer.

<job_description>
{jd_text}
</job_description>

Classify requirements: MUST-HAVE ("must", "required", "minimum"), NICE-TO-HAVE ("preferred", "a plus"), deal-breakers (explicitly disqualifying certifications, clearances, licenses). Separate technical_skills from soft_skills. Capture seniority terms and explicit durations. All arrays must exist; if empty, return [].

Return ONLY a raw JSON object with keys: role_title, must_have_requirements, nice_to_have_requirements, deal_breakers, technical_skills, soft_skills, experience_requirements, education_requirements, certification_requirements, industry_domain, additional_notes. No markdown."#;

const RESUME_PROMPT: &str = r#"You are the Resume Evidence Extraction Engine. You do not evaluate, judge, or score. Extract evidence ONLY from the resume text below into a normalized JSON structure. Zero inference: do not derive skills from job titles; extract durations only if stated.

<candidate_resume>
{resume_text}
</candidate_resume>

Return ONLY a raw JSON object with keys: candidate_name, work_experience (array of {job_title, company, duration, responsibilities}), technical_skills, soft_skills, education (array of {degree, institution, year}), certifications, projects, achievements, additional_info. No markdown."#;

const FIT_SCORE_PROMPT: &str = r#"You are the Candidate Fit Scoring Engine. Compute a deterministic weighted fit score from the parsed JD and resume evidence below. Use only the evidence given; anything not explicitly present is missing.

<jd_parsed>
{jd_text}
</jd_parsed>

<resume_parsed>
{resume_text}
</resume_parsed>

Weights: hard skills 40%, experience alignment 30%, education & certifications 10%, soft skills 20%. If any JD deal_breaker is missing from the resume, overall_score = 0 and list it in deal_breakers_found.

Return ONLY a raw JSON object with keys: overall_score (0-100), score_breakdown {hard_skills, experience, education, soft_skills}, deal_breakers_found, reasoning_trace, final_recommendation (Strong Fit | Potential Fit | Weak Fit | No Fit), data_sufficiency (High | Medium | Low). No markdown."#;

/// 从模型回复中截取首个 JSON 对象（首个 '{' 到末个 '}'）
fn extract_first_json(response: &str) -> Option<Value> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

async fn run_analysis(llm: &Arc<dyn LlmClient>, prompt: String) -> Result<String, String> {
    let messages = [
        Message::system(ANALYSIS_SYSTEM_PROMPT),
        Message::user(prompt),
    ];
    let response = llm.complete(&messages).await?;
    match extract_first_json(&response) {
        Some(json) => serde_json::to_string(&json).map_err(|e| e.to_string()),
        None => {
            tracing::warn!("analysis reply contained no parseable JSON object");
            Err("Analysis model did not return a JSON object".to_string())
        }
    }
}

fn required_text(args: &Value, key: &str) -> Result<String, String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(String::from)
        .ok_or_else(|| format!("Missing {}", key))
}

/// JD 解析工具
pub struct AnalyzeJobDescriptionTool {
    llm: Arc<dyn LlmClient>,
}

impl AnalyzeJobDescriptionTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tool for AnalyzeJobDescriptionTool {
    fn name(&self) -> &str {
        "analyze_job_description"
    }

    fn description(&self) -> &str {
        "Analyzes a job description to extract key information such as role, skills, experience, location, and compensation."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "jd_text": {"type": "string", "description": "The complete text of the job description"}
            },
            "required": ["jd_text"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let jd_text = required_text(&args, "jd_text")?;
        run_analysis(&self.llm, JD_PROMPT.replace("{jd_text}", &jd_text)).await
    }
}

/// 简历证据抽取工具
pub struct AnalyzeResumeTool {
    llm: Arc<dyn LlmClient>,
}

impl AnalyzeResumeTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tool for AnalyzeResumeTool {
    fn name(&self) -> &str {
        "analyze_resume"
    }

    fn description(&self) -> &str {
        "Reviews a resume, extracting skills, experience, education and achievements as structured evidence for matching against a job description."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "resume_text": {"type": "string", "description": "The complete text of the resume"}
            },
            "required": ["resume_text"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let resume_text = required_text(&args, "resume_text")?;
        run_analysis(&self.llm, RESUME_PROMPT.replace("{resume_text}", &resume_text)).await
    }
}

/// 匹配评分工具
pub struct CandidateFitTool {
    llm: Arc<dyn LlmClient>,
}

impl CandidateFitTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tool for CandidateFitTool {
    fn name(&self) -> &str {
        "candidate_fit_score"
    }

    fn description(&self) -> &str {
        "Calculates a fit score (0-100) for a candidate based on their resume and a job description, with confidence level and detailed explanation."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "resume_text": {"type": "string", "description": "The candidate's resume text or parsed evidence"},
                "jd_text": {"type": "string", "description": "The job description text or parsed requirements"}
            },
            "required": ["resume_text", "jd_text"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let resume_text = required_text(&args, "resume_text")?;
        let jd_text = required_text(&args, "jd_text")?;
        let prompt = FIT_SCORE_PROMPT
            .replace("{jd_text}", &jd_text)
            .replace("{resume_text}", &resume_text);
        run_analysis(&self.llm, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FragmentStream, ToolSpec};
    use futures_util::stream;

    struct CannedLlm(String);

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
            Ok(self.0.clone())
        }
        async fn complete_stream(
            &self,
            _messages: &[Message],
            _tools: &[ToolSpec],
        ) -> Result<FragmentStream, String> {
            Ok(Box::pin(stream::empty()))
        }
    }

    #[test]
    fn extracts_json_wrapped_in_prose() {
        let reply = "Sure! Here is the result:\n```json\n{\"role_title\": \"Engineer\"}\n```";
        let json = extract_first_json(reply).unwrap();
        assert_eq!(json["role_title"], "Engineer");
    }

    #[test]
    fn no_braces_means_no_json() {
        assert!(extract_first_json("I cannot help with that").is_none());
    }

    #[tokio::test]
    async fn jd_analysis_returns_compacted_json() {
        let llm: Arc<dyn LlmClient> = Arc::new(CannedLlm(
            "{\"role_title\": \"Backend Engineer\", \"must_have_requirements\": []}".to_string(),
        ));
        let tool = AnalyzeJobDescriptionTool::new(llm);
        let out = tool
            .execute(serde_json::json!({"jd_text": "We need a backend engineer"}))
            .await
            .unwrap();
        assert!(out.contains("Backend Engineer"));
    }

    #[tokio::test]
    async fn non_json_reply_is_an_error() {
        let llm: Arc<dyn LlmClient> = Arc::new(CannedLlm("plain prose".to_string()));
        let tool = AnalyzeResumeTool::new(llm);
        let err = tool
            .execute(serde_json::json!({"resume_text": "ten years of Rust"}))
            .await
            .unwrap_err();
        assert!(err.contains("did not return a JSON object"));
    }

    #[tokio::test]
    async fn fit_score_requires_both_texts() {
        let llm: Arc<dyn LlmClient> = Arc::new(CannedLlm("{}".to_string()));
        let tool = CandidateFitTool::new(llm);
        let err = tool
            .execute(serde_json::json!({"resume_text": "x"}))
            .await
            .unwrap_err();
        assert!(err.contains("Missing jd_text"));
    }
}
