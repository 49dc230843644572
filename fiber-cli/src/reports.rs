use anyhow::Result;
use colored::Colorize;
use fiber_vitality::{
    ActivityKind, ActivityOutcome, MonsterRecord, RecoveryOutcome, StreakRecord, TombRecord,
    VitalityStatus,
};
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use crate::scenarios::ScenarioResult;

/// Result of one CLI command, rendered as console text or JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandReport {
    Create {
        user_id: String,
        monster: MonsterRecord,
        notice: &'static str,
    },
    Status {
        user_id: String,
        status: Option<VitalityStatus>,
        monster: Option<MonsterRecord>,
        tombs: usize,
    },
    Recover {
        user_id: String,
        outcome: RecoveryOutcome,
        notice: &'static str,
    },
    Complete {
        user_id: String,
        outcome: ActivityOutcome,
        notice: &'static str,
    },
    Retire {
        user_id: String,
        tomb: TombRecord,
    },
    Streak {
        user_id: String,
        activity: ActivityKind,
        streak: Option<StreakRecord>,
        bonus: u32,
    },
    Tombs {
        user_id: String,
        tombs: Vec<TombRecord>,
    },
    Activities {
        activities: Vec<ActivityEntry>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub name: ActivityKind,
    pub base_damage: f64,
}

pub fn generate_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    let json_output = serde_json::to_string_pretty(value)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

fn write_monster(out: &mut dyn Write, monster: &MonsterRecord) -> Result<()> {
    writeln!(
        out,
        "🐾 {} ({}) health {:.1}, last recovery {}",
        monster.name.bold(),
        monster.image_ref,
        monster.health,
        monster.last_recovery_date
    )?;
    Ok(())
}

fn write_tomb(out: &mut dyn Write, tomb: &TombRecord) -> Result<()> {
    writeln!(
        out,
        "🪦 {} died {} at {:.1} health: {}",
        tomb.name.bold(),
        tomb.died_at.format("%Y-%m-%d %H:%M:%S UTC"),
        tomb.final_health,
        tomb.cause
    )?;
    Ok(())
}

pub fn generate_console_command(out: &mut dyn Write, report: &CommandReport) -> Result<()> {
    match report {
        CommandReport::Create {
            user_id, monster, ..
        } => {
            writeln!(out, "{} for {user_id}", "✨ Monster created".green().bold())?;
            write_monster(out, monster)?;
        }
        CommandReport::Status {
            user_id,
            status,
            monster,
            tombs,
        } => {
            match status {
                Some(status) => writeln!(out, "Status for {user_id}: {}", status.as_str().bold())?,
                None => writeln!(out, "{user_id} has never had a monster")?,
            }
            if let Some(monster) = monster {
                write_monster(out, monster)?;
            }
            writeln!(out, "Tombs: {tombs}")?;
        }
        CommandReport::Recover { outcome, .. } => match outcome {
            RecoveryOutcome::Applied {
                rolled,
                gained,
                health,
            } => writeln!(
                out,
                "{} +{gained:.1} (rolled {rolled}), health {health:.1}",
                "💚 Recovered".green()
            )?,
            RecoveryOutcome::AlreadyRecovered { health } => writeln!(
                out,
                "{} health {health:.1}",
                "⏸️  Already recovered today,".yellow()
            )?,
            RecoveryOutcome::Retired { tomb } => {
                writeln!(out, "{}", "💀 Monster retired".red().bold())?;
                write_tomb(out, tomb)?;
            }
        },
        CommandReport::Complete { outcome, .. } => match outcome {
            ActivityOutcome::Damaged {
                activity,
                damage,
                streak,
            } => writeln!(
                out,
                "{} {activity}: {:.1} damage (base {:.1}, bonus {}), streak {}, health {:.1}",
                "⚔️ ".yellow(),
                damage.total,
                damage.base,
                damage.bonus,
                streak.count,
                damage.health_after
            )?,
            ActivityOutcome::AlreadyCompleted { activity, health } => writeln!(
                out,
                "{} {activity} already completed today, health {health:.1}",
                "⏸️ ".yellow()
            )?,
            ActivityOutcome::Retired {
                activity,
                damage,
                tomb,
                ..
            } => {
                if let Some(damage) = damage {
                    writeln!(
                        out,
                        "{activity}: {:.1} damage, health {:.1}",
                        damage.total, damage.health_after
                    )?;
                }
                writeln!(out, "{}", "💀 Monster retired".red().bold())?;
                write_tomb(out, tomb)?;
            }
        },
        CommandReport::Retire { tomb, .. } => {
            writeln!(out, "{}", "💀 Monster retired".red().bold())?;
            write_tomb(out, tomb)?;
        }
        CommandReport::Streak {
            activity,
            streak,
            bonus,
            ..
        } => match streak {
            Some(streak) => writeln!(
                out,
                "🔥 {activity}: {} day(s) as of {}, bonus {bonus}",
                streak.count, streak.date
            )?,
            None => writeln!(out, "{activity}: no streak yet")?,
        },
        CommandReport::Tombs { user_id, tombs } => {
            writeln!(out, "Tombs for {user_id}: {}", tombs.len())?;
            for tomb in tombs {
                write_tomb(out, tomb)?;
            }
        }
        CommandReport::Activities { activities } => {
            writeln!(out, "Available activities:")?;
            for entry in activities {
                writeln!(
                    out,
                    "  {:20} - base damage {:.1}",
                    entry.name.as_str(),
                    entry.base_damage
                )?;
            }
        }
    }
    Ok(())
}

pub fn generate_console_scenarios(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Scenario Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==========================".cyan())?;

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = total - passed;

    writeln!(out, "Total scenarios: {total}")?;
    writeln!(out, "Passed: {}", passed.to_string().green())?;
    writeln!(out, "Failed: {}", failed.to_string().red())?;
    if total > 0 {
        #[allow(clippy::cast_precision_loss)]
        let success_rate = (passed as f64 / total as f64) * 100.0;
        writeln!(out, "Success rate: {success_rate:.1}%")?;
    }
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(out, "{} {}", status, result.scenario_name.bold())?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;
        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, Utc};

    fn monster() -> MonsterRecord {
        MonsterRecord::new(
            "Gloop",
            "img://gloop",
            64.0,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
    }

    fn render(report: &CommandReport) -> String {
        let mut buf = Vec::new();
        generate_console_command(&mut buf, report).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn console_status_lists_monster_and_tombs() {
        let text = render(&CommandReport::Status {
            user_id: "u1".to_string(),
            status: Some(VitalityStatus::Alive),
            monster: Some(monster()),
            tombs: 2,
        });
        assert!(text.contains("alive"));
        assert!(text.contains("Gloop"));
        assert!(text.contains("health 64.0"));
        assert!(text.contains("Tombs: 2"));
    }

    #[test]
    fn console_tombs_render_cause() {
        let died_at = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let tomb = TombRecord::from_monster(&monster(), "neglect", died_at);
        let text = render(&CommandReport::Tombs {
            user_id: "u1".to_string(),
            tombs: vec![tomb],
        });
        assert!(text.contains("Tombs for u1: 1"));
        assert!(text.contains("1970-01-01 00:00:00 UTC"));
        assert!(text.contains("neglect"));
    }

    #[test]
    fn json_report_is_tagged_by_command() {
        let mut buf = Vec::new();
        generate_json(
            &mut buf,
            &CommandReport::Streak {
                user_id: "u1".to_string(),
                activity: ActivityKind::RiddleSolved,
                streak: None,
                bonus: 0,
            },
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["command"], "streak");
        assert_eq!(value["activity"], "riddle-solved");
        assert!(value["streak"].is_null());
    }

    #[test]
    fn console_scenarios_report_counts() {
        let results = vec![
            ScenarioResult {
                scenario_name: "ok".to_string(),
                passed: true,
                iterations_run: 2,
                successful_iterations: 2,
                failures: Vec::new(),
                average_duration: Duration::from_millis(1),
            },
            ScenarioResult {
                scenario_name: "bad".to_string(),
                passed: false,
                iterations_run: 2,
                successful_iterations: 1,
                failures: vec!["Iteration 2: boom".to_string()],
                average_duration: Duration::from_millis(1),
            },
        ];
        let mut buf = Vec::new();
        generate_console_scenarios(&mut buf, &results, Duration::from_millis(5)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Total scenarios: 2"));
        assert!(text.contains("Success rate: 50.0%"));
        assert!(text.contains("Iterations: 1/2 successful"));
        assert!(text.contains("boom"));
    }
}
