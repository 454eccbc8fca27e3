//! Encounter-level damage profile analysis: healing load estimates, timing
//! overlap, cooldown planning, and the healer priority ranking.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::analysis::classifier::{action_signals_dispel, action_signals_immediacy};
use crate::catalog::entity::{Ability, AbilityType, DamageProfile, TargetType};
use crate::catalog::error::CatalogError;
use crate::catalog::store::{ContentSource, ContentStore};

/// Tuning constants for the analyzer. The defaults carry the values the
/// content team calibrated against live seasons; they are fields rather
/// than hidden constants so a host can override them.
#[derive(Debug, Clone, Copy)]
pub struct AnalyzerConfig {
    /// Two cooldowns within this many seconds of each other count as
    /// overlapping.
    pub overlap_window_seconds: u32,
    /// Healing load score ceilings: light <= light_max < moderate <=
    /// moderate_max < heavy <= heavy_max < burst.
    pub light_max: u32,
    pub moderate_max: u32,
    pub heavy_max: u32,
    /// This many critical abilities forces burst regardless of score.
    pub burst_critical_count: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            overlap_window_seconds: 10,
            light_max: 2,
            moderate_max: 6,
            heavy_max: 12,
            burst_critical_count: 2,
        }
    }
}

/// Aggregate sustained-healer-effort estimate for an encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HealingLoad {
    Light,
    Moderate,
    Heavy,
    Burst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDistribution {
    pub critical: usize,
    pub high: usize,
    pub moderate: usize,
    pub mechanic: usize,
}

impl ProfileDistribution {
    pub fn total(&self) -> usize {
        self.critical + self.high + self.moderate + self.mechanic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TimingFrequency {
    /// Key mechanics fire on a fixed rotation.
    Periodic,
    /// Critical but not rotational; fires on a fight condition.
    Conditional,
    /// No reliable pattern worth planning around.
    Random,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyTiming {
    pub ability_id: Uuid,
    pub ability_name: String,
    pub cooldown_seconds: u32,
    pub frequency: TimingFrequency,
    pub overlaps_with_others: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecommendationKind {
    MajorDefensiveCooldown,
    GroupHealingRotation,
    TankExternalDefensive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownRecommendation {
    pub kind: RecommendationKind,
    pub target_ability_ids: Vec<Uuid>,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageProfileAnalysis {
    pub encounter_id: Uuid,
    pub distribution: ProfileDistribution,
    pub healing_load: HealingLoad,
    pub healing_load_score: u32,
    pub key_timings: Vec<KeyTiming>,
    pub recommendations: Vec<CooldownRecommendation>,
}

pub struct DamageProfileAnalyzer<S = ContentStore> {
    source: Arc<S>,
    config: AnalyzerConfig,
}

impl<S: ContentSource> DamageProfileAnalyzer<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self::with_config(source, AnalyzerConfig::default())
    }

    pub fn with_config(source: Arc<S>, config: AnalyzerConfig) -> Self {
        DamageProfileAnalyzer { source, config }
    }

    /// Analyze one encounter's abilities. NotFound only when the encounter
    /// itself is missing; an existing encounter with zero abilities yields
    /// a well-formed empty analysis (all-zero distribution, light load, no
    /// timings, no recommendations).
    pub async fn analyze_damage_profile(
        &self,
        encounter_id: Uuid,
    ) -> Result<DamageProfileAnalysis, CatalogError> {
        let abilities = self.source.abilities_for_encounter(encounter_id).await?;
        Ok(analyze_abilities(encounter_id, &abilities.records, &self.config))
    }
}

/// Synchronous core of the analysis; exposed for direct use on ability
/// lists already in hand.
pub fn analyze_abilities(
    encounter_id: Uuid,
    abilities: &[Ability],
    config: &AnalyzerConfig,
) -> DamageProfileAnalysis {
    let mut distribution = ProfileDistribution::default();
    for ability in abilities {
        match ability.damage_profile {
            DamageProfile::Critical => distribution.critical += 1,
            DamageProfile::High => distribution.high += 1,
            DamageProfile::Moderate => distribution.moderate += 1,
            DamageProfile::Mechanic => distribution.mechanic += 1,
        }
    }

    let group_damage: Vec<&Ability> = abilities
        .iter()
        .filter(|a| a.ability_type == AbilityType::Damage && a.targets == TargetType::Group)
        .collect();

    let score = distribution.critical as u32 * 4
        + distribution.high as u32 * 3
        + group_damage.len() as u32 * 2;
    let healing_load = if distribution.critical >= config.burst_critical_count
        || score > config.heavy_max
    {
        // The critical-count trigger forces burst even at lower scores.
        HealingLoad::Burst
    } else if score > config.moderate_max {
        HealingLoad::Heavy
    } else if score > config.light_max {
        HealingLoad::Moderate
    } else {
        HealingLoad::Light
    };

    let key_timings = key_timings(abilities, config);
    let recommendations = recommendations(abilities, &group_damage);

    DamageProfileAnalysis {
        encounter_id,
        distribution,
        healing_load,
        healing_load_score: score,
        key_timings,
        recommendations,
    }
}

fn key_timings(abilities: &[Ability], config: &AnalyzerConfig) -> Vec<KeyTiming> {
    let timed: Vec<(&Ability, u32)> = abilities
        .iter()
        .filter_map(|a| a.cooldown_seconds.map(|cd| (a, cd)))
        .collect();

    timed
        .iter()
        .map(|(ability, cooldown)| {
            let frequency = if ability.is_key_mechanic {
                TimingFrequency::Periodic
            } else if ability.damage_profile == DamageProfile::Critical {
                TimingFrequency::Conditional
            } else {
                TimingFrequency::Random
            };
            let overlaps_with_others = timed.iter().any(|(other, other_cd)| {
                other.id != ability.id
                    && cooldown.abs_diff(*other_cd) <= config.overlap_window_seconds
            });
            KeyTiming {
                ability_id: ability.id,
                ability_name: ability.name.clone(),
                cooldown_seconds: *cooldown,
                frequency,
                overlaps_with_others,
            }
        })
        .collect()
}

fn recommendations(
    abilities: &[Ability],
    group_damage: &[&Ability],
) -> Vec<CooldownRecommendation> {
    let mut out = Vec::new();

    let critical_ids: Vec<Uuid> = abilities
        .iter()
        .filter(|a| a.damage_profile == DamageProfile::Critical)
        .map(|a| a.id)
        .collect();
    if !critical_ids.is_empty() {
        out.push(CooldownRecommendation {
            kind: RecommendationKind::MajorDefensiveCooldown,
            rationale: format!(
                "{} critical abilit{} demand a committed major defensive",
                critical_ids.len(),
                if critical_ids.len() == 1 { "y" } else { "ies" }
            ),
            target_ability_ids: critical_ids,
        });
    }

    if group_damage.len() >= 2 {
        out.push(CooldownRecommendation {
            kind: RecommendationKind::GroupHealingRotation,
            rationale: format!(
                "{} group-wide damage events call for a rotation of group healing cooldowns",
                group_damage.len()
            ),
            target_ability_ids: group_damage.iter().map(|a| a.id).collect(),
        });
    }

    let tank_critical_ids: Vec<Uuid> = abilities
        .iter()
        .filter(|a| a.targets == TargetType::Tank && a.damage_profile == DamageProfile::Critical)
        .map(|a| a.id)
        .collect();
    if !tank_critical_ids.is_empty() {
        out.push(CooldownRecommendation {
            kind: RecommendationKind::TankExternalDefensive,
            rationale: "critical tank damage warrants an external defensive assignment"
                .to_string(),
            target_ability_ids: tank_critical_ids,
        });
    }

    out
}

/// How prominently the display layer should render a ranked ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayHint {
    Highlight,
    Emphasize,
    Standard,
    Muted,
}

impl DisplayHint {
    pub const fn for_priority(priority: u32) -> Self {
        match priority {
            100.. => Self::Highlight,
            70..=99 => Self::Emphasize,
            40..=69 => Self::Standard,
            _ => Self::Muted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityPriority {
    pub ability_id: Uuid,
    pub ability_name: String,
    pub priority: u32,
    pub reasoning: String,
    pub display_hint: DisplayHint,
}

/// Rank abilities by healer attention priority, highest first. The sort is
/// stable: ties keep their input order.
pub fn prioritize_for_healer(abilities: &[Ability]) -> Vec<AbilityPriority> {
    let mut ranked: Vec<AbilityPriority> = abilities.iter().map(score_ability).collect();
    ranked.sort_by(|a, b| b.priority.cmp(&a.priority));
    ranked
}

fn score_ability(ability: &Ability) -> AbilityPriority {
    let mut priority = ability.damage_profile.priority() * 25;
    let mut reasons = vec![format!("{} damage profile", ability.damage_profile.as_str())];

    if ability.targets == TargetType::Group {
        priority += 20;
        reasons.push("hits the whole group".to_string());
    }
    if ability.targets == TargetType::Tank {
        priority += 15;
        reasons.push("threatens the tank".to_string());
    }
    if ability.is_key_mechanic {
        priority += 30;
        reasons.push("defining encounter mechanic".to_string());
    }
    if action_signals_immediacy(&ability.healer_action) {
        priority += 25;
        reasons.push("healer action demands an immediate response".to_string());
    }
    if action_signals_dispel(&ability.healer_action) {
        priority += 20;
        reasons.push("requires a dispel".to_string());
    }
    if ability.cooldown_seconds.is_some() {
        priority += 10;
        reasons.push("recurs on a known cooldown".to_string());
    }

    AbilityPriority {
        ability_id: ability.id,
        ability_name: ability.name.clone(),
        priority,
        reasoning: reasons.join("; "),
        display_hint: DisplayHint::for_priority(priority),
    }
}

/// UI palette for one damage profile: {primary, background, text, border}
/// as hex sRGB. Each text/background pair satisfies WCAG AA (>= 4.5:1),
/// verified by test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorScheme {
    pub primary: &'static str,
    pub background: &'static str,
    pub text: &'static str,
    pub border: &'static str,
}

pub const fn ui_color_scheme(profile: DamageProfile) -> ColorScheme {
    match profile {
        DamageProfile::Critical => ColorScheme {
            primary: "#DC2626",
            background: "#7F1D1D",
            text: "#FFFFFF",
            border: "#991B1B",
        },
        DamageProfile::High => ColorScheme {
            primary: "#EA580C",
            background: "#9A3412",
            text: "#FFFFFF",
            border: "#C2410C",
        },
        DamageProfile::Moderate => ColorScheme {
            primary: "#2563EB",
            background: "#1E3A8A",
            text: "#FFFFFF",
            border: "#1D4ED8",
        },
        DamageProfile::Mechanic => ColorScheme {
            primary: "#71717A",
            background: "#3F3F46",
            text: "#FFFFFF",
            border: "#52525B",
        },
    }
}
