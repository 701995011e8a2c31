use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use flate2::read::GzDecoder;
use preint_rs::config::PipelineConfig;
use preint_rs::filters::{IirFilter, RunningMean};
use preint_rs::imu::{merge_triple, validate_triple, IntegrationMethod, Preintegrator};
use preint_rs::{ImuBody, ImuSample, ImuStatus, PreintegratedImu, TripleImuSample, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MethodArg {
    Riemann,
    Trapezoidal,
    Bortz,
}

#[derive(Parser, Debug)]
#[command(name = "preintegrate")]
#[command(about = "Replay an IMU log into delta-theta / delta-velocity records", long_about = None)]
struct Args {
    /// Path to IMU log (*.json or *.json.gz)
    #[arg(long)]
    log: PathBuf,

    /// Pipeline config (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Integration method
    #[arg(long, value_enum)]
    method: Option<MethodArg>,

    /// Bortz sub-steps per sample interval
    #[arg(long)]
    substeps: Option<u32>,

    /// Raw samples per emitted record
    #[arg(long)]
    output_every: Option<usize>,
}

#[derive(Deserialize)]
struct Axis {
    x: f64,
    y: f64,
    z: f64,
}

impl From<&Axis> for Vec3 {
    fn from(a: &Axis) -> Self {
        Vec3::new(a.x, a.y, a.z)
    }
}

#[derive(Deserialize)]
struct UnitReading {
    gyro: Axis,
    accel: Axis,
}

#[derive(Deserialize)]
struct Reading {
    timestamp: f64,
    gyro: Option<Axis>,
    accel: Option<Axis>,
    #[serde(default)]
    status: Option<u32>,
    /// Redundant units, merged before integration
    #[serde(default)]
    units: Option<Vec<UnitReading>>,
    /// Raw ADC counts for the IIR bank
    #[serde(default)]
    raw: Option<Vec<i16>>,
}

#[derive(Deserialize)]
struct LogFile {
    readings: Vec<Reading>,
}

#[derive(Debug, Serialize)]
struct Record {
    #[serde(flatten)]
    preintegrated: PreintegratedImu,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_filtered: Option<Vec<f64>>,
}

/// Everything a replay produced, in emission order
struct Replay {
    records: Vec<Record>,
    accel_mean: RunningMean,
}

fn load_log(path: &Path) -> anyhow::Result<LogFile> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let gz = GzDecoder::new(file);
        let reader = BufReader::new(gz);
        Ok(serde_json::from_reader(reader)?)
    } else {
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn resolve_config(args: &Args) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };

    let substeps = match config.integration {
        IntegrationMethod::Bortz { substeps } => substeps,
        _ => preint_rs::imu::DEFAULT_SUBSTEPS,
    };
    let substeps = args.substeps.unwrap_or(substeps);

    config.integration = match args.method {
        Some(MethodArg::Riemann) => IntegrationMethod::RiemannSum,
        Some(MethodArg::Trapezoidal) => IntegrationMethod::Trapezoidal,
        Some(MethodArg::Bortz) => IntegrationMethod::Bortz { substeps },
        None => match config.integration {
            IntegrationMethod::Bortz { .. } => IntegrationMethod::Bortz { substeps },
            other => other,
        },
    };
    if let Some(n) = args.output_every {
        config.output_every = n;
    }

    config.validate()?;
    Ok(config)
}

/// Turn one log line into a fused sample, merging redundant units if present.
fn to_sample(reading: &Reading) -> Option<ImuSample> {
    if let Some(units) = &reading.units {
        if units.len() != 3 {
            log::warn!(
                "skipping reading at t={:.6}: expected 3 units, got {}",
                reading.timestamp,
                units.len()
            );
            return None;
        }
        let mut triple = TripleImuSample {
            time: reading.timestamp,
            status: ImuStatus(reading.status.unwrap_or(ImuStatus::IMU_OK_MASK)),
            units: [ImuBody::default(); 3],
        };
        for (slot, unit) in triple.units.iter_mut().zip(units) {
            *slot = ImuBody::new(Vec3::from(&unit.gyro), Vec3::from(&unit.accel));
        }
        validate_triple(&mut triple);
        return Some(merge_triple(&triple));
    }

    match (&reading.gyro, &reading.accel) {
        (Some(gyro), Some(accel)) => Some(
            ImuSample::new(reading.timestamp, Vec3::from(gyro), Vec3::from(accel))
                .with_status(ImuStatus(reading.status.unwrap_or(0))),
        ),
        _ => None,
    }
}

/// Integrate `readings` into records of `config.output_every` intervals each.
///
/// A trailing partial record is emitted at the end of the log.
fn replay(readings: &[Reading], config: &PipelineConfig) -> anyhow::Result<Replay> {
    let mut integrator = Preintegrator::new(config.integration)?;
    let mut iir = config.iir.clone().map(IirFilter::new).transpose()?;
    let mut raw_out = vec![0.0; iir.as_ref().map(|f| f.channels()).unwrap_or(0)];
    let mut accel_mean = RunningMean::new(3);
    let mut records = Vec::new();
    let mut pending = 0usize;

    for reading in readings {
        if let (Some(filter), Some(raw)) = (iir.as_mut(), &reading.raw) {
            if let Err(e) = filter.apply_i16(raw, &mut raw_out) {
                log::warn!("raw block at t={:.6} rejected: {}", reading.timestamp, e);
            }
        }

        let Some(sample) = to_sample(reading) else {
            continue;
        };

        let accel = sample.body.accel.map(|c| c as f32);
        accel_mean.push(accel.as_slice())?;

        let primed = integrator.last_sample().is_some();
        integrator.advance(&sample);
        if !primed {
            continue;
        }

        pending += 1;
        if pending >= config.output_every {
            records.push(Record {
                preintegrated: integrator.take(),
                raw_filtered: iir.as_ref().map(|_| raw_out.clone()),
            });
            pending = 0;
        }
    }

    if pending > 0 {
        log::debug!("flushing partial record of {} intervals", pending);
        records.push(Record {
            preintegrated: integrator.take(),
            raw_filtered: iir.as_ref().map(|_| raw_out.clone()),
        });
    }

    Ok(Replay {
        records,
        accel_mean,
    })
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    let log_file = load_log(&args.log)?;
    log::info!(
        "{} readings, method {:?}, {} samples per record",
        log_file.readings.len(),
        config.integration,
        config.output_every
    );

    let Replay {
        records,
        accel_mean,
    } = replay(&log_file.readings, &config)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for record in &records {
        serde_json::to_writer(&mut out, record)?;
        writeln!(out)?;
    }
    out.flush()?;

    let mean = accel_mean.mean();
    log::info!(
        "{} records, mean accel [{:.4}, {:.4}, {:.4}] over {} samples",
        records.len(),
        mean[0],
        mean[1],
        mean[2],
        accel_mean.count()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    run(&args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn log_json(count: usize) -> String {
        let readings: Vec<String> = (0..count)
            .map(|i| {
                format!(
                    r#"{{"timestamp": {}, "gyro": {{"x": 0.0, "y": 0.0, "z": 0.1}}, "accel": {{"x": 0.0, "y": 0.0, "z": 9.81}}}}"#,
                    i as f64 * 0.01
                )
            })
            .collect();
        format!(r#"{{"readings": [{}]}}"#, readings.join(","))
    }

    fn config(output_every: usize) -> PipelineConfig {
        PipelineConfig {
            output_every,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_replay_flushes_partial_record() {
        let log: LogFile = serde_json::from_str(&log_json(15)).unwrap();
        let replay = replay(&log.readings, &config(10)).unwrap();

        // 14 intervals: one full record of 10, then the remaining 4
        assert_eq!(replay.records.len(), 2);
        assert_abs_diff_eq!(replay.records[0].preintegrated.dt, 0.10, epsilon = 1e-9);
        assert_abs_diff_eq!(replay.records[1].preintegrated.dt, 0.04, epsilon = 1e-9);
        assert_abs_diff_eq!(replay.records[1].preintegrated.time, 0.14, epsilon = 1e-9);

        let total: f64 = replay.records.iter().map(|r| r.preintegrated.dt).sum();
        assert_abs_diff_eq!(total, 0.14, epsilon = 1e-9);
        assert_eq!(replay.accel_mean.count(), 15);
    }

    #[test]
    fn test_replay_exact_multiple_has_no_empty_tail() {
        let log: LogFile = serde_json::from_str(&log_json(11)).unwrap();
        let replay = replay(&log.readings, &config(10)).unwrap();

        assert_eq!(replay.records.len(), 1);
        assert!(replay.records.iter().all(|r| !r.preintegrated.is_empty()));
    }

    #[test]
    fn test_replay_merges_triple_reading() {
        let json = r#"{"readings": [
            {"timestamp": 1.0, "status": 458752, "units": [
                {"gyro": {"x": 0.0, "y": 0.0, "z": 0.0}, "accel": {"x": 1.0, "y": 0.0, "z": 9.0}},
                {"gyro": {"x": 0.0, "y": 0.0, "z": 0.0}, "accel": {"x": 3.0, "y": 0.0, "z": 9.0}},
                {"gyro": {"x": 0.0, "y": 0.0, "z": 0.0}, "accel": {"x": 0.0, "y": 0.0, "z": 0.0}}
            ]}
        ]}"#;
        let log: LogFile = serde_json::from_str(json).unwrap();
        let sample = to_sample(&log.readings[0]).unwrap();

        // Third unit reports zero acceleration and is dropped from the mean
        assert!(!sample.status.unit_ok(2));
        assert_eq!(sample.body.accel, Vec3::new(2.0, 0.0, 9.0));
    }
}
