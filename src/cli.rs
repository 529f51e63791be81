//! Command-line interface of the `liftlog` binary.

use clap::{Parser, Subcommand};
use std::str::FromStr;

use crate::error::{ClientError, Result};
use crate::models::{ExerciseForm, Intensity, SetForm};

#[derive(Parser, Debug)]
#[command(name = "liftlog", version, about = "Log workouts to a liftlog backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the backend is reachable.
    Health,

    /// Create an account.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "LIFTLOG_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log in and remember the session.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "LIFTLOG_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session.
    Logout,

    /// Show who is logged in.
    Whoami,

    /// List past sessions.
    History {
        /// Only print totals.
        #[arg(long)]
        summary: bool,
    },

    /// Record a session and save it.
    Log {
        /// `NAME:SET,SET,...` where a set is `REPS[xWEIGHT][@INTENSITY]`,
        /// e.g. `Bench Press:10x135@medium,8x135@high`.
        #[arg(long = "exercise", required = true)]
        exercises: Vec<ExerciseArg>,

        #[arg(long)]
        notes: Option<String>,
    },
}

/// One `--exercise` argument, checked by `ExerciseForm` when recorded.
#[derive(Debug, Clone)]
pub struct ExerciseArg(pub ExerciseForm);

impl FromStr for ExerciseArg {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, sets) = s.rsplit_once(':').ok_or_else(|| {
            ClientError::Validation(format!("Expected NAME:SETS, got {:?}", s))
        })?;
        let sets = sets
            .split(',')
            .map(str::trim)
            .filter(|set| !set.is_empty())
            .map(parse_set)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self(ExerciseForm {
            name: name.trim().to_string(),
            sets,
        }))
    }
}

fn parse_set(raw: &str) -> Result<SetForm> {
    let invalid = || ClientError::Validation(format!("Invalid set {:?}", raw));

    let (load, intensity) = match raw.split_once('@') {
        Some((load, intensity)) => (load, intensity.parse::<Intensity>()?),
        None => (raw, Intensity::default()),
    };
    let (reps, weight) = match load.split_once(|c: char| c.eq_ignore_ascii_case(&'x')) {
        Some((reps, weight)) => (reps, Some(weight.trim().parse::<f64>().map_err(|_| invalid())?)),
        None => (load, None),
    };
    let reps = reps.trim().parse::<u32>().map_err(|_| invalid())?;

    Ok(SetForm {
        reps: Some(reps),
        weight,
        intensity,
    })
}
