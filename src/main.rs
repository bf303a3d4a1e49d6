use clap::{Args, Parser, Subcommand};
use log::info;
use riscv_isg::config::IsgConfig;
use riscv_isg::error::{IsgError, Result};
use riscv_isg::harness::corpus::Corpus;
use riscv_isg::random_asm::asm_maker::OutputFormat;
use riscv_isg::random_asm::inst_generator::InstructionsGenerator;
use riscv_isg::random_asm::instructions::{Complexity, Extension};
use riscv_isg::utils::{build_rv32_march, resolve_output_dir};
use std::fs::{self, create_dir_all};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "riscv-isg")]
#[command(about = "Randomized RV32IMC instruction sequence generator for side-channel measurement")]
struct Cli {
    /// Path to an isg.toml configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

/// Generator options shared by all subcommands; they override the config file
#[derive(Args, Debug)]
struct GeneratorArgs {
    /// Minimum number of instructions per program
    #[arg(short = 'n', long)]
    num_instructions: Option<usize>,
    /// Enabled extensions (comma separated)
    #[arg(short, long, value_enum, value_delimiter = ',')]
    extensions: Vec<Extension>,
    /// Restrict top-level instructions to these mnemonics (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    allow: Vec<String>,
    /// Add every nop a second time to the candidate list, biasing selection toward nop
    #[arg(long)]
    nop_fill: bool,
    /// Restrict top-level instructions to these complexity tiers (comma separated)
    #[arg(long, value_enum, value_delimiter = ',')]
    complexity: Vec<Complexity>,
    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,
}

impl GeneratorArgs {
    fn apply(self, config: &mut IsgConfig) -> Result<()> {
        let section = &mut config.generator;
        if let Some(num_instructions) = self.num_instructions {
            section.num_instructions = num_instructions;
        }
        if !self.extensions.is_empty() {
            section.config.extensions = self.extensions.into_iter().collect();
        }
        if !self.allow.is_empty() {
            section.config.allowed_instructions = Some(self.allow.into_iter().collect());
        }
        if self.nop_fill {
            section.config.allow_nop_fill = true;
        }
        if !self.complexity.is_empty() {
            section.config.complexity = Some(self.complexity.into_iter().collect());
        }
        if self.seed.is_some() {
            section.seed = self.seed;
        }
        config.validate()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a single program
    Generate {
        #[command(flatten)]
        generator: GeneratorArgs,
        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "raw")]
        format: OutputFormat,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Replace the output file if it already exists
        #[arg(long)]
        overwrite: bool,
    },
    /// Add C harness programs to a corpus directory in parallel
    Corpus {
        #[command(flatten)]
        generator: GeneratorArgs,
        /// Number of new programs
        #[arg(short = 'C', long, default_value = "1")]
        count: usize,
        /// Program name prefix
        #[arg(long)]
        prefix: Option<String>,
        /// Fixed corpus directory (default: the configured src_dir)
        #[arg(long, conflicts_with = "workspace_dir")]
        output_dir: Option<PathBuf>,
        /// Workspace directory for a random corpus directory
        #[arg(long, conflicts_with = "output_dir")]
        workspace_dir: Option<PathBuf>,
        /// Number of parallel workers (default: number of CPU cores)
        #[arg(short = 'p', long)]
        parallel: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_environment();

    let mut config = IsgConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate {
            generator,
            format,
            output,
            overwrite,
        } => {
            generator.apply(&mut config)?;
            let overwrite = overwrite || config.output.overwrite;
            let section = &config.generator;
            info!(
                "🎲 Generating {} instructions for {}",
                section.num_instructions,
                build_rv32_march(&section.config.extensions)
            );

            let mut isg = match section.seed {
                Some(seed) => InstructionsGenerator::from_seed(section.config.clone(), seed)?,
                None => InstructionsGenerator::from_os_rng(section.config.clone())?,
            };
            let program = isg.generate(section.num_instructions)?;
            let rendered = format.render(&program);

            match output {
                Some(path) => {
                    if path.exists() && !overwrite {
                        return Err(IsgError::file(format!(
                            "The file {:?} already exists. Pass --overwrite to replace it.",
                            path
                        )));
                    }
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        create_dir_all(parent)?;
                    }
                    fs::write(&path, rendered)?;
                    info!(
                        "✅ Wrote {} lines to {:?} (buffer register {})",
                        program.lines.len(),
                        path,
                        program.buffer_register
                    );
                }
                None => println!("{}", rendered),
            }
        }
        Commands::Corpus {
            generator,
            count,
            prefix,
            output_dir,
            workspace_dir,
            parallel,
        } => {
            generator.apply(&mut config)?;
            if let Some(prefix) = prefix {
                config.output.prefix = prefix;
            }

            let num_threads = parallel.unwrap_or_else(num_cpus::get);
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .map_err(|e| {
                    IsgError::config(format!("Failed to initialize thread pool: {}", e))
                })?;

            let fixed_dir = if output_dir.is_none() && workspace_dir.is_none() {
                Some(config.output.src_dir.clone())
            } else {
                output_dir
            };
            let src_dir = resolve_output_dir(fixed_dir, workspace_dir)?;
            info!(
                "🚀 Generating {} programs of {} instructions with {} workers",
                count, config.generator.num_instructions, num_threads
            );

            let corpus = Corpus::new(src_dir, config.generator.config.clone());
            let written = corpus.extend_corpus(
                &config.output.prefix,
                config.generator.num_instructions,
                count,
                config.generator.seed,
            )?;
            info!(
                "✅ Corpus now holds {} new programs in {:?}",
                written.len(),
                corpus.src_dir()
            );
        }
    }

    Ok(())
}

fn setup_environment() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_nop_fill_flag() {
        let command = Cli::command();
        let generate = command.find_subcommand("generate").unwrap();
        let nop_fill = generate
            .get_arguments()
            .find(|arg| arg.get_id() == "nop_fill")
            .unwrap();
        let help = nop_fill.get_help().unwrap().to_string();
        assert!(help.contains("second time"), "{}", help);

        let cli = Cli::try_parse_from(["riscv-isg", "generate", "--nop-fill"]).unwrap();
        let Commands::Generate { generator, .. } = cli.command else {
            panic!("expected the generate subcommand");
        };
        let mut config = IsgConfig::default();
        generator.apply(&mut config).unwrap();
        assert!(config.generator.config.allow_nop_fill);
    }
}
