//! Stateless classification and analysis over ability records. Everything
//! here is synchronous and CPU-only; the only suspension points live in the
//! store reads that feed it.

pub mod classifier;
pub mod damage;

pub use classifier::{
    classify_ability, recommended_actions, validate_healer_relevance, AbilityClassification,
    Complexity, HealerActionPlan, Impact, Urgency,
};
pub use damage::{
    prioritize_for_healer, ui_color_scheme, AbilityPriority, AnalyzerConfig, ColorScheme,
    CooldownRecommendation, DamageProfileAnalysis, DamageProfileAnalyzer, DisplayHint,
    HealingLoad, KeyTiming, ProfileDistribution, RecommendationKind, TimingFrequency,
};
