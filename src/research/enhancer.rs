use async_trait::async_trait;

use crate::models::ResearchResult;
use crate::research::client::RawResearch;
use crate::types::AppResult;

const SUMMARY_ANSWER_CHARS: usize = 300;

/// Client-facing context a job carries into enhancement.
#[derive(Debug, Clone, Default)]
pub struct EnhancementContext {
    pub client_context: Option<String>,
    pub industry_focus: Option<String>,
}

/// Turns a raw engine answer into a client-ready result.
///
/// Implementations must not depend on anything beyond `raw` and `context`,
/// so the default template can be swapped for a model-backed generator.
#[async_trait]
pub trait ResultEnhancer: Send + Sync {
    async fn enhance(&self, raw: RawResearch, context: &EnhancementContext) -> AppResult<ResearchResult>;
}

/// Fixed-text executive summary and recommendations.
#[derive(Debug, Clone, Default)]
pub struct TemplateEnhancer;

impl TemplateEnhancer {
    pub fn executive_summary(answer: &str, client_context: Option<&str>) -> String {
        let excerpt: String = answer.chars().take(SUMMARY_ANSWER_CHARS).collect();
        format!(
            "Executive Summary: {}...\n\nThis summary is tailored for {}.",
            excerpt,
            non_empty(client_context).unwrap_or("your client")
        )
    }

    pub fn recommendations(industry_focus: Option<&str>) -> Vec<String> {
        vec![
            format!(
                "Based on our research, we recommend focusing on key areas relevant to {}.",
                non_empty(industry_focus).unwrap_or("your industry")
            ),
            "Consider implementing the strategies outlined in the research findings.".to_string(),
            "Further investigation may be warranted in areas where data is incomplete.".to_string(),
        ]
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[async_trait]
impl ResultEnhancer for TemplateEnhancer {
    async fn enhance(&self, raw: RawResearch, context: &EnhancementContext) -> AppResult<ResearchResult> {
        let executive_summary = Self::executive_summary(&raw.answer, context.client_context.as_deref());
        let recommendations = Self::recommendations(context.industry_focus.as_deref());

        Ok(ResearchResult {
            answer: raw.answer,
            learnings: raw.learnings,
            visited_urls: raw.visited_urls,
            executive_summary: Some(executive_summary),
            recommendations: Some(recommendations),
        })
    }
}
