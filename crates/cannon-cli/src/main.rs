//! `cannon` - multiply two random N×N matrices on a √P × √P grid of
//! ranks with Cannon's algorithm and check the result against a
//! single-process reference product.
//!
//! By default the ranks are threads of this process. Built with the `mpi`
//! feature, every process started by `mpirun` is one rank and P is the size
//! of the MPI world.
//!
//! ```bash
//! cannon                      # 4 ranks, N = 6
//! cannon -n 9 -s 12 --seed 7  # 9 ranks, N = 12, reproducible inputs
//! RUST_LOG=debug cannon -n 16
//! mpirun -n 9 cannon -s 12    # with --features mpi
//! ```

mod logging;

use std::process::ExitCode;

use anyhow::{Context, Result};
use cannon_comm::GridTopology;
use cannon_core::{cannon_multiply, CannonError, Coordinator, LaunchPlan, Operand};
use cannon_matrix::{CpuBackend, DenseMatrix};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

/// Distributed dense matrix multiplication with Cannon's algorithm
#[derive(Parser, Debug)]
#[command(name = "cannon")]
#[command(about = "Distributed dense matrix multiplication with Cannon's algorithm", long_about = None)]
#[command(version)]
struct Cli {
    /// Size of the NxN matrix (must be divisible by the grid size; defaults to 3 x grid size)
    #[arg(short = 's', long)]
    matrix_size: Option<usize>,

    /// Number of cooperating processes (must be a perfect square; under
    /// mpirun the launcher's process count is used instead)
    #[arg(short = 'n', long, default_value_t = 4)]
    processes: usize,

    /// Seed for the random input matrices
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn random_inputs(n: usize, seed: Option<u64>) -> (DenseMatrix, DenseMatrix) {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let a = DenseMatrix::random(n, &mut rng);
    let b = DenseMatrix::random(n, &mut rng);
    (a, b)
}

/// Check the run preconditions before any rank starts. On failure the
/// error is the run's only output, printed once when `report` is set.
fn validate(process_count: usize, cli: &Cli, report: bool) -> Option<LaunchPlan> {
    match LaunchPlan::validate(process_count, cli.matrix_size) {
        Ok(plan) => Some(plan),
        Err(e) => {
            if report {
                println!("Error: {e}");
            }
            None
        }
    }
}

/// Body executed by every rank. Returns the coordinator's verdict, whether
/// the distributed product matches the reference, and `None` elsewhere.
fn run_rank<W: GridTopology>(
    world: &W,
    cli: &Cli,
    plan: &LaunchPlan,
) -> std::result::Result<Option<bool>, CannonError> {
    let backend = CpuBackend::new();
    let mut coordinator =
        Coordinator::elect(world, || random_inputs(plan.matrix_size, cli.seed))?;
    cannon_multiply(world, coordinator.as_mut(), &backend)?;

    let Some(coordinator) = coordinator else {
        return Ok(None);
    };
    let expected = coordinator
        .operand(Operand::A)
        .matmul(coordinator.operand(Operand::B), &backend)?;
    let matches = coordinator
        .product()
        .is_some_and(|product| product.allclose(&expected));

    println!("Matrix size: {0}x{0}", plan.matrix_size);
    println!("Processor grid: {0}x{0}", plan.grid_size);
    println!("Block size: {0}x{0}", plan.block_size);
    println!();
    if matches {
        println!("Test with reference product: Results match.");
    } else {
        println!("Test with reference product: Results do not match.");
    }
    Ok(Some(matches))
}

#[cfg(not(feature = "mpi"))]
fn run(cli: &Cli) -> Result<bool> {
    use cannon_comm::World;

    info!(processes = cli.processes, matrix_size = ?cli.matrix_size, "starting run");
    let Some(plan) = validate(cli.processes, cli, true) else {
        return Ok(false);
    };
    let outcomes = World::launch(plan.process_count, |world| run_rank(&world, cli, &plan))
        .context("failed to run process group")?;

    let mut verdict = None;
    for (rank, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(Some(matches)) => verdict = Some(matches),
            Ok(None) => {}
            Err(e) => return Err(e).with_context(|| format!("rank {rank} failed")),
        }
    }
    Ok(verdict == Some(true))
}

/// One rank of an `mpirun` job. Every process validates on its own, so a
/// bad configuration stops the whole job before anyone enters a collective.
#[cfg(feature = "mpi")]
fn run(cli: &Cli) -> Result<bool> {
    use cannon_comm::{MpiGroup, ProcessGroup};

    let universe = mpi::initialize().context("failed to initialize MPI")?;
    let world = MpiGroup::new(universe.world());
    let rank = world.rank();
    let is_coordinator = rank == Coordinator::WORLD_RANK;
    if cli.processes != world.size() {
        tracing::debug!(
            requested = cli.processes,
            processes = world.size(),
            "using the MPI world size"
        );
    }

    info!(processes = world.size(), matrix_size = ?cli.matrix_size, "starting run");
    let Some(plan) = validate(world.size(), cli, is_coordinator) else {
        return Ok(false);
    };
    let verdict = run_rank(&world, cli, &plan).with_context(|| format!("rank {rank} failed"))?;
    // Only the coordinator judges the product.
    Ok(verdict.unwrap_or(true))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init_logging(&cli.log_level) {
        eprintln!("{e:#}");
    }

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cannon").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = cli(&[]);
        assert_eq!(cli.processes, 4);
        assert_eq!(cli.matrix_size, None);
        assert_eq!(cli.seed, None);
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn test_short_flags() {
        let cli = cli(&["-s", "12", "-n", "9", "--seed", "3"]);
        assert_eq!(cli.matrix_size, Some(12));
        assert_eq!(cli.processes, 9);
        assert_eq!(cli.seed, Some(3));
    }

    #[test]
    fn test_rejects_non_numeric_size() {
        assert!(Cli::try_parse_from(["cannon", "-s", "six"]).is_err());
    }

    #[test]
    fn test_seeded_inputs_are_reproducible() {
        assert_eq!(random_inputs(4, Some(9)), random_inputs(4, Some(9)));
    }

    #[test]
    fn test_validate_accepts_default_size() {
        let plan = validate(9, &cli(&[]), false).unwrap();
        assert_eq!((plan.grid_size, plan.matrix_size, plan.block_size), (3, 9, 3));
    }

    #[test]
    fn test_validate_rejects_before_launch() {
        assert!(validate(6, &cli(&[]), false).is_none());
        assert!(validate(4, &cli(&["-s", "5"]), false).is_none());
        assert!(validate(4, &cli(&["-s", "0"]), false).is_none());
    }

    #[test]
    fn test_run_rank_reports_only_on_coordinator() {
        let cli = cli(&["--seed", "5"]);
        let plan = validate(4, &cli, false).unwrap();
        let verdicts =
            cannon_comm::World::launch(4, |world| run_rank(&world, &cli, &plan)).unwrap();
        assert_eq!(verdicts, vec![Ok(Some(true)), Ok(None), Ok(None), Ok(None)]);
    }

    #[cfg(not(feature = "mpi"))]
    #[test]
    fn test_run_succeeds_on_valid_grid() {
        assert!(run(&cli(&["-n", "4", "-s", "8", "--seed", "1"])).unwrap());
    }

    #[cfg(not(feature = "mpi"))]
    #[test]
    fn test_run_fails_on_non_square_group() {
        assert!(!run(&cli(&["-n", "6"])).unwrap());
    }

    #[cfg(not(feature = "mpi"))]
    #[test]
    fn test_run_fails_on_indivisible_size() {
        assert!(!run(&cli(&["-n", "9", "-s", "10"])).unwrap());
    }

    #[cfg(not(feature = "mpi"))]
    #[test]
    fn test_run_rejects_huge_process_count_without_launching() {
        // A launch would allocate one channel per rank; validation must
        // refuse first.
        assert!(!run(&cli(&["-n", "18446744073709551615"])).unwrap());
        assert!(!run(&cli(&["-n", "18446744065119617025", "-s", "3"])).unwrap());
    }
}
