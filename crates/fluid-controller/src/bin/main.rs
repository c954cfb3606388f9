use clap::Parser;

use fluid_controller::cli::DatasetControllerOpt;

fn main() {
    fluvio_future::subscriber::init_tracer(None);

    let opt = DatasetControllerOpt::parse();
    fluid_controller::start::main_loop(opt);
}
