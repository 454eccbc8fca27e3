//! Pure ability classification: one ability record in, an
//! urgency/complexity/impact triple plus preparation guidance out.
//! Deterministic by construction; identical input always yields identical
//! output.

use serde::Serialize;

use crate::catalog::entity::{Ability, AbilityType, DamageProfile, TargetType};
use crate::catalog::report::{ValidationReport, ValidationSeverity};

/// How fast the healer must react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Urgency {
    Low,
    Moderate,
    High,
    Immediate,
}

/// How much execution the healer response demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
    Extreme,
}

impl Complexity {
    const fn bumped(self) -> Self {
        match self {
            Self::Simple => Self::Moderate,
            Self::Moderate => Self::Complex,
            Self::Complex | Self::Extreme => Self::Extreme,
        }
    }
}

/// Consequence of mishandling the ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Impact {
    Low,
    Moderate,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityClassification {
    pub urgency: Urgency,
    pub complexity: Complexity,
    pub impact: Impact,
    pub recommended_preparation: String,
}

/// Abilities that historically wiped groups when handled at their default
/// urgency. Kept as an explicit table so content reviewers can audit it;
/// matching is case-insensitive on the full name.
pub const PRIORITY_OVERRIDE_NAMES: &[&str] = &[
    "Alerting Shrill",
    "Burrow Charge",
    "Toxic Ricochet",
    "Dark Orb",
    "Unstable Corruption",
];

fn name_is_override(name: &str) -> bool {
    PRIORITY_OVERRIDE_NAMES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(name.trim()))
}

/// The healer action text signals immediacy ("use cooldown immediately").
pub fn action_signals_immediacy(healer_action: &str) -> bool {
    healer_action.to_lowercase().contains("immediate")
}

/// The healer action text asks for a dispel; used as a priority boost by
/// the ranking downstream.
pub fn action_signals_dispel(healer_action: &str) -> bool {
    healer_action.to_lowercase().contains("dispel")
}

pub fn classify_ability(ability: &Ability) -> AbilityClassification {
    let urgency = escalate(base_urgency(ability), ability, Urgency::Immediate);
    let impact = escalate_impact(base_impact(ability), ability);
    let complexity = complexity_for(ability);
    AbilityClassification {
        urgency,
        complexity,
        impact,
        recommended_preparation: preparation_for(ability, urgency),
    }
}

fn base_urgency(ability: &Ability) -> Urgency {
    match ability.damage_profile {
        DamageProfile::Critical => {
            if ability.targets == TargetType::Group {
                Urgency::Immediate
            } else {
                Urgency::High
            }
        }
        DamageProfile::High => {
            if ability.targets == TargetType::Tank {
                Urgency::High
            } else {
                Urgency::Moderate
            }
        }
        DamageProfile::Moderate => Urgency::Moderate,
        DamageProfile::Mechanic => {
            if ability.ability_type == AbilityType::Interrupt {
                Urgency::High
            } else {
                Urgency::Moderate
            }
        }
    }
}

fn escalate(base: Urgency, ability: &Ability, to: Urgency) -> Urgency {
    if name_is_override(&ability.name) || action_signals_immediacy(&ability.healer_action) {
        return to.max(base);
    }
    base
}

fn base_impact(ability: &Ability) -> Impact {
    match ability.damage_profile {
        // Critical abilities always land at critical impact, regardless of
        // target scope.
        DamageProfile::Critical => Impact::Critical,
        DamageProfile::High => {
            if ability.targets == TargetType::Tank {
                Impact::High
            } else {
                Impact::Moderate
            }
        }
        DamageProfile::Moderate => Impact::Moderate,
        DamageProfile::Mechanic => {
            if ability.ability_type == AbilityType::Interrupt {
                Impact::High
            } else {
                Impact::Low
            }
        }
    }
}

fn escalate_impact(base: Impact, ability: &Ability) -> Impact {
    if name_is_override(&ability.name) || action_signals_immediacy(&ability.healer_action) {
        return Impact::Critical.max(base);
    }
    base
}

fn complexity_for(ability: &Ability) -> Complexity {
    let mut complexity = match ability.ability_type {
        AbilityType::Damage => {
            if ability.targets == TargetType::Group {
                Complexity::Moderate
            } else {
                Complexity::Simple
            }
        }
        AbilityType::Heal | AbilityType::Interrupt => Complexity::Simple,
        AbilityType::Mechanic | AbilityType::Movement => Complexity::Moderate,
    };
    if ability.damage_profile == DamageProfile::Critical {
        complexity = complexity.bumped();
    }
    if ability.is_key_mechanic {
        complexity = complexity.bumped();
    }
    complexity
}

fn preparation_for(ability: &Ability, urgency: Urgency) -> String {
    let mut text = match urgency {
        Urgency::Immediate => {
            "Pre-position before the cast and hold a major cooldown ready".to_string()
        }
        Urgency::High => "Top the likely targets ahead of the cast".to_string(),
        Urgency::Moderate => "Keep steady throughput; no dedicated cooldown needed".to_string(),
        Urgency::Low => "Track passively".to_string(),
    };
    if let Some(cooldown) = ability.cooldown_seconds {
        text.push_str(&format!("; recurs roughly every {cooldown}s"));
    }
    if ability.is_key_mechanic {
        text.push_str("; this is a defining mechanic of the fight");
    }
    text
}

/// One entry of the fixed per-profile action table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealerActionPlan {
    pub action: &'static str,
    pub timing: &'static str,
    pub description: &'static str,
}

const CRITICAL_ACTIONS: &[HealerActionPlan] = &[
    HealerActionPlan {
        action: "major cooldown",
        timing: "on cast start",
        description: "Commit a raid or personal defensive before the hit lands",
    },
    HealerActionPlan {
        action: "pre-heal",
        timing: "2-3s before impact",
        description: "Bring the whole group to full; partial health will not survive",
    },
    HealerActionPlan {
        action: "position",
        timing: "before cast",
        description: "Stand where every player is in range of your group heal",
    },
];

const HIGH_ACTIONS: &[HealerActionPlan] = &[
    HealerActionPlan {
        action: "focused healing",
        timing: "on impact",
        description: "Spot-heal the struck target back above the danger line",
    },
    HealerActionPlan {
        action: "external defensive",
        timing: "on cast start",
        description: "Consider an external on the tank if their mitigation is down",
    },
];

const MODERATE_ACTIONS: &[HealerActionPlan] = &[
    HealerActionPlan {
        action: "sustained healing",
        timing: "continuous",
        description: "Maintain rotational throughput; no cooldown required",
    },
    HealerActionPlan {
        action: "resource check",
        timing: "between casts",
        description: "Use the lull to regenerate for the next burst window",
    },
];

const MECHANIC_ACTIONS: &[HealerActionPlan] = &[
    HealerActionPlan {
        action: "track mechanic",
        timing: "throughout",
        description: "Watch the debuff or cast bar; healing output is secondary",
    },
    HealerActionPlan {
        action: "dispel ready",
        timing: "on application",
        description: "Keep the dispel off cooldown for the applied effect",
    },
];

/// Fixed lookup table: 2-3 recommended actions per damage profile.
pub const fn recommended_actions(profile: DamageProfile) -> &'static [HealerActionPlan] {
    match profile {
        DamageProfile::Critical => CRITICAL_ACTIONS,
        DamageProfile::High => HIGH_ACTIONS,
        DamageProfile::Moderate => MODERATE_ACTIONS,
        DamageProfile::Mechanic => MECHANIC_ACTIONS,
    }
}

/// Check one ability for healer-facing authoring problems. Error-severity
/// findings make the ability invalid; warnings and infos are advisory.
pub fn validate_healer_relevance(ability: &Ability) -> ValidationReport {
    let mut report = ValidationReport::default();
    let context = format!("ability '{}'", ability.name);

    if ability.healer_action.trim().is_empty() {
        report.push(
            ValidationSeverity::Error,
            &context,
            "healerAction is empty; every ability must tell the healer what to do",
        );
    }

    let should_be_critical =
        name_is_override(&ability.name) || action_signals_immediacy(&ability.healer_action);
    if should_be_critical && ability.damage_profile != DamageProfile::Critical {
        report.push(
            ValidationSeverity::Warning,
            &context,
            format!(
                "matches the should-be-critical heuristic but is tagged '{}'",
                ability.damage_profile.as_str()
            ),
        );
    }

    if ability.ability_type == AbilityType::Movement && ability.targets == TargetType::Location {
        report.push(
            ValidationSeverity::Info,
            &context,
            "movement ability targeting a location is typically not healer-relevant",
        );
    }

    if ability.damage_profile == DamageProfile::Critical {
        if ability.cooldown_seconds.is_none() {
            report.push(
                ValidationSeverity::Warning,
                &context,
                "critical ability has no cooldown value; timing analysis cannot plan for it",
            );
        }
        if !ability.is_key_mechanic {
            report.push(
                ValidationSeverity::Warning,
                &context,
                "critical ability is not flagged as a key mechanic",
            );
        }
    }

    report
}
