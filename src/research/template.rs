use serde::{Deserialize, Serialize};

/// Named research preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchTemplate {
    QuickOverview,
    DeepDive,
    Comprehensive,
    CompetitiveAnalysis,
    #[default]
    Custom,
}

impl ResearchTemplate {
    pub const ALL: [ResearchTemplate; 5] = [
        ResearchTemplate::QuickOverview,
        ResearchTemplate::DeepDive,
        ResearchTemplate::Comprehensive,
        ResearchTemplate::CompetitiveAnalysis,
        ResearchTemplate::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchTemplate::QuickOverview => "quick_overview",
            ResearchTemplate::DeepDive => "deep_dive",
            ResearchTemplate::Comprehensive => "comprehensive",
            ResearchTemplate::CompetitiveAnalysis => "competitive_analysis",
            ResearchTemplate::Custom => "custom",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn parameters(&self) -> ResearchParameters {
        parameters_for_template(self.as_str())
    }
}

impl std::fmt::Display for ResearchTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchParameters {
    pub depth: i32,
    pub breadth: i32,
}

/// Default depth/breadth for a template name.
///
/// Unknown names resolve to the custom preset; rejecting them is the
/// caller's job.
pub fn parameters_for_template(name: &str) -> ResearchParameters {
    let (depth, breadth) = match name {
        "quick_overview" => (1, 3),
        "deep_dive" => (4, 3),
        "comprehensive" => (3, 8),
        "competitive_analysis" => (3, 5),
        _ => (2, 4),
    };
    ResearchParameters { depth, breadth }
}
