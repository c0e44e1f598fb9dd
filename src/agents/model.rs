use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    Chat,
    Form,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Published,
    Draft,
    Archived,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Published => "published",
            AgentStatus::Draft => "draft",
            AgentStatus::Archived => "archived",
        }
    }
}

/// Closed set of agent icons. Serialized by name; each maps to a static asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AgentIcon {
    Bot,
    Briefcase,
    Calculator,
    CalendarClock,
    Code,
    FileText,
    Headset,
    LayoutGrid,
    Megaphone,
    MessagesSquare,
    PenTool,
    Scale,
    ShieldCheck,
    Star,
    Terminal,
    Users,
    Zap,
}

const ICONS: &[(AgentIcon, &str, &str)] = &[
    (AgentIcon::Bot, "Bot", "icons/bot.svg"),
    (AgentIcon::Briefcase, "Briefcase", "icons/briefcase.svg"),
    (AgentIcon::Calculator, "Calculator", "icons/calculator.svg"),
    (AgentIcon::CalendarClock, "CalendarClock", "icons/calendar-clock.svg"),
    (AgentIcon::Code, "Code", "icons/code.svg"),
    (AgentIcon::FileText, "FileText", "icons/file-text.svg"),
    (AgentIcon::Headset, "Headset", "icons/headset.svg"),
    (AgentIcon::LayoutGrid, "LayoutGrid", "icons/layout-grid.svg"),
    (AgentIcon::Megaphone, "Megaphone", "icons/megaphone.svg"),
    (AgentIcon::MessagesSquare, "MessagesSquare", "icons/messages-square.svg"),
    (AgentIcon::PenTool, "PenTool", "icons/pen-tool.svg"),
    (AgentIcon::Scale, "Scale", "icons/scale.svg"),
    (AgentIcon::ShieldCheck, "ShieldCheck", "icons/shield-check.svg"),
    (AgentIcon::Star, "Star", "icons/star.svg"),
    (AgentIcon::Terminal, "Terminal", "icons/terminal.svg"),
    (AgentIcon::Users, "Users", "icons/users.svg"),
    (AgentIcon::Zap, "Zap", "icons/zap.svg"),
];

impl AgentIcon {
    /// Icon used when an agent has none.
    pub const FALLBACK: AgentIcon = AgentIcon::Zap;

    pub fn from_name(name: &str) -> Option<Self> {
        ICONS
            .iter()
            .find(|(_, n, _)| *n == name)
            .map(|(icon, _, _)| *icon)
    }

    pub fn name(self) -> &'static str {
        ICONS
            .iter()
            .find(|(icon, _, _)| *icon == self)
            .map_or("Zap", |(_, n, _)| n)
    }

    pub fn asset(self) -> &'static str {
        ICONS
            .iter()
            .find(|(icon, _, _)| *icon == self)
            .map_or("icons/zap.svg", |(_, _, a)| a)
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        ICONS.iter().map(|(_, n, _)| *n)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub interface_type: InterfaceType,
    pub prompt_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<AgentIcon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: AgentStatus,
    #[serde(default)]
    pub free_trial_offered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial_duration_days: Option<u32>,
    #[serde(with = "crate::store::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "crate::store::timestamp")]
    pub updated_at: OffsetDateTime,
}

impl Agent {
    pub fn is_published(&self) -> bool {
        self.status == AgentStatus::Published
    }

    pub fn icon_or_fallback(&self) -> AgentIcon {
        self.icon.unwrap_or(AgentIcon::FALLBACK)
    }

    /// Case-insensitive match on name, description or any tag.
    /// `needle` must already be lowercase.
    pub fn matches_search(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.name.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}
