use crate::args::{Cli, Commands};
use crate::context::ExecutionContext;
use crate::handlers;
use crate::logging;
use anyhow::Result;
use expcat_engine::GetVarOptions;
use expcat_runtime::IndexOptions;

pub fn run(cli: Cli) -> Result<()> {
    logging::init(cli.verbose);

    let ctx = ExecutionContext::new(cli.db.as_deref(), cli.config.as_deref(), cli.format)?;

    match cli.command {
        Commands::Index {
            roots,
            force,
            prune,
            follow_symlinks,
            show_files,
        } => {
            let defaults = &ctx.config().index;
            let options = IndexOptions {
                force,
                prune: prune || defaults.prune,
                follow_symlinks: follow_symlinks || defaults.follow_symlinks,
            };
            handlers::index::handle(&ctx, roots, options, show_files)
        }

        Commands::Experiments { keyword } => handlers::experiments::handle(&ctx, keyword.as_deref()),

        Commands::Show { experiment } => handlers::experiments::show(&ctx, &experiment),

        Commands::Keywords => handlers::experiments::keywords(&ctx),

        Commands::Files { experiment } => handlers::files::handle(&ctx, &experiment),

        Commands::Variables {
            experiment,
            frequency,
            detail,
        } => handlers::variables::handle(&ctx, &experiment, frequency, detail),

        Commands::Frequencies { experiment } => {
            handlers::variables::frequencies(&ctx, experiment.as_deref())
        }

        Commands::Resolve {
            experiment,
            variable,
            frequency,
        } => handlers::files::resolve(&ctx, &experiment, &variable, frequency),

        Commands::Getvar {
            experiment,
            variable,
            frequency,
            start,
            end,
            n,
            offset,
            chunks,
            compute,
        } => {
            let options = GetVarOptions {
                frequency,
                start_time: start,
                end_time: end,
                n,
                offset,
                chunks: match chunks {
                    Some(spec) => expcat_engine::parse_chunks(&spec)?,
                    None => Default::default(),
                },
            };
            handlers::getvar::handle(&ctx, &experiment, &variable, &options, compute)
        }

        Commands::Info => handlers::info::handle(&ctx),
    }
}
