use std::path::Path;
use std::process::ExitCode;
use std::sync::{mpsc, Arc};

use clap::Parser;
use tracing::{error, info};

use heron_executor::cli::ExecutorArgs;
use heron_executor::command::logger::StdEventReceiver;
use heron_executor::command::EventLogger;
use heron_executor::config::ContainerContext;
use heron_executor::error::ExecutorError;
use heron_executor::lifecycle::{self, SignalManager};
use heron_executor::logging::Logging;
use heron_executor::store::file::FileStateStore;
use heron_executor::store::StateStore;
use heron_executor::supervisor::{RestartLimits, Supervisor};
use heron_executor::watcher::{self, PlanWatcher};

fn main() -> ExitCode {
    // the launch contract is positional; any mismatch prints usage and
    // exits 1 before anything else happens
    let args = match ExecutorArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(1);
        }
    };

    match run(args) {
        // the reap loop never returns cleanly
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("executor terminated: {}", err);
            lifecycle::terminate_group();
            ExitCode::from(1)
        }
    }
}

fn run(args: ExecutorArgs) -> Result<(), ExecutorError> {
    Logging::try_init()?;
    lifecycle::redirect_std_streams()?;
    lifecycle::become_group_leader()?;
    SignalManager::shutdown_handle();

    let context = Arc::new(ContainerContext::from_args(&args)?);
    lifecycle::prepare_launch(&context, Path::new("."))?;
    lifecycle::record_own_pid(Path::new("."), context.shard)?;

    let (events, output) = mpsc::channel();
    let _output_logger = StdEventReceiver.log(output);

    let supervisor = Arc::new(Supervisor::new(RestartLimits::default(), events));
    let plan_watcher = Arc::new(PlanWatcher::new(context.clone(), supervisor.clone()));

    // the initial delivery from the store bootstraps the process set
    let stores: Vec<Box<dyn StateStore>> =
        vec![Box::new(FileStateStore::new(&context.coordination.root))];
    watcher::subscribe(plan_watcher, &stores, &context.topology.name)?;

    info!(shard = context.shard, "executor started, entering reap loop");
    supervisor.reap_loop()?;
    Ok(())
}
