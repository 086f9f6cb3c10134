//! Operator commands read from stdin while the sensor comes from a device.

use std::str::FromStr;

use anyhow::{anyhow, bail, Error};

use crate::optimizer::OptimizeStrategy;
use crate::pipeline::IngestionPipeline;
use crate::ports::{BrightnessActuator, CalibrationPersistence};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    SetBrightness(u8),
    Optimize(OptimizeStrategy),
    Forget(u32),
    Reset,
    Stats,
    Status,
}

impl FromStr for OperatorCommand {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| anyhow!("empty command"))?
            .to_ascii_lowercase();
        let argument = words.next();
        if words.next().is_some() {
            bail!("too many arguments in {line:?}");
        }

        let command = match (verb.as_str(), argument) {
            ("set", Some(value)) => {
                let value: u8 = value
                    .parse()
                    .map_err(|_| anyhow!("brightness must be 0-100, got {value:?}"))?;
                if value > 100 {
                    bail!("brightness must be 0-100, got {value}");
                }
                OperatorCommand::SetBrightness(value)
            }
            ("optimize", None) => OperatorCommand::Optimize(OptimizeStrategy::Compact),
            ("optimize", Some(strategy)) => OperatorCommand::Optimize(parse_strategy(strategy)?),
            ("forget", Some(lux)) => OperatorCommand::Forget(
                lux.parse()
                    .map_err(|_| anyhow!("lux must be a whole number, got {lux:?}"))?,
            ),
            ("reset", None) => OperatorCommand::Reset,
            ("stats", None) => OperatorCommand::Stats,
            ("status", None) => OperatorCommand::Status,
            _ => bail!("unknown command {line:?}"),
        };
        Ok(command)
    }
}

fn parse_strategy(value: &str) -> Result<OptimizeStrategy, Error> {
    match value.to_ascii_lowercase().as_str() {
        "prune" => Ok(OptimizeStrategy::Prune),
        "fit" => Ok(OptimizeStrategy::AdaptiveFit),
        "compact" => Ok(OptimizeStrategy::Compact),
        other => Err(anyhow!("unknown optimize strategy '{other}'")),
    }
}

/// Run `command` and describe the outcome in one line.
pub async fn run_command<A, P>(
    pipeline: &IngestionPipeline<A, P>,
    command: OperatorCommand,
) -> Result<String, String>
where
    A: BrightnessActuator,
    P: CalibrationPersistence,
{
    match command {
        OperatorCommand::SetBrightness(value) => {
            pipeline.adjust_brightness(value).await;
            Ok(format!("brightness {value}% pending"))
        }
        OperatorCommand::Optimize(strategy) => pipeline
            .optimize_calibration(strategy)
            .await
            .map(|(before, after)| format!("{before} -> {after} calibration points"))
            .map_err(|e| e.to_string()),
        OperatorCommand::Forget(lux) => pipeline
            .forget_calibration_near(lux)
            .await
            .map(|removed| format!("forgot {removed} point(s) near {lux} lux"))
            .map_err(|e| e.to_string()),
        OperatorCommand::Reset => pipeline
            .reset_calibration()
            .await
            .map(|()| "calibration cleared".to_string())
            .map_err(|e| e.to_string()),
        OperatorCommand::Stats => {
            let stats = pipeline.calibration_stats().await;
            serde_json::to_string(&stats).map_err(|e| e.to_string())
        }
        OperatorCommand::Status => {
            let snapshot = pipeline.snapshot().await;
            serde_json::to_string(&snapshot).map_err(|e| e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationStore;
    use crate::models::CalibrationPoint;
    use crate::pipeline::PipelineConfig;
    use crate::ports::{LogActuator, MemoryPersistence};
    use chrono::Utc;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "set 65".parse::<OperatorCommand>().unwrap(),
            OperatorCommand::SetBrightness(65)
        );
        assert_eq!(
            "OPTIMIZE fit".parse::<OperatorCommand>().unwrap(),
            OperatorCommand::Optimize(OptimizeStrategy::AdaptiveFit)
        );
        assert_eq!(
            "optimize".parse::<OperatorCommand>().unwrap(),
            OperatorCommand::Optimize(OptimizeStrategy::Compact)
        );
        assert_eq!(
            "  forget 320 ".parse::<OperatorCommand>().unwrap(),
            OperatorCommand::Forget(320)
        );
        assert_eq!("reset".parse::<OperatorCommand>().unwrap(), OperatorCommand::Reset);
    }

    #[test]
    fn test_rejects_bad_commands() {
        for line in ["", "set", "set 101", "set loud", "forget -4", "reset now", "dim"] {
            assert!(line.parse::<OperatorCommand>().is_err(), "{line:?} parsed");
        }
    }

    #[tokio::test]
    async fn test_stats_command_reports_json() {
        let store = CalibrationStore::hydrate(MemoryPersistence::with_points(vec![
            CalibrationPoint::new(100, 20, Utc::now()),
            CalibrationPoint::new(700, 70, Utc::now()),
        ]))
        .await;
        let pipeline = IngestionPipeline::new(LogActuator::default(), store, PipelineConfig::default());

        let reply = run_command(&pipeline, OperatorCommand::Stats).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();

        assert_eq!(value["count"], 2);
        assert_eq!(value["maxLux"], 700);
    }
}
