use std::io;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, shells};
use promptfan::commands::ask::{self, AskArgs};
use promptfan::commands::auth::{self, AuthArgs};
use promptfan::commands::config::{self, ConfigArgs};
use promptfan::commands::models;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("PF_GIT_SHA"),
    " ",
    env!("PF_BUILD_TS"),
    ")"
);

const ROOT_HELP_EXAMPLES: &str = "Examples:\n  promptfan ask -m gpt-4o -m claude-3-5-haiku-latest --message \"Hi\" \"Be terse\"\n  git diff | promptfan ask -m gpt-4o-mini --message \"Review this diff\"\n  promptfan models\n  promptfan completion bash > ~/.local/share/bash-completion/completions/promptfan";

const ASK_HELP_EXAMPLES: &str = "Examples:\n  promptfan ask -m gpt-4o -m o1-mini --message \"Hi\" \"Be terse\"\n  echo \"Be terse\" | promptfan ask -m gpt-4o --message \"Hi\" --image-url https://example.com/shot.png\n  promptfan ask -m deepseek/deepseek-r1 --message \"Hi\" --dry-run \"Be terse\"";

#[derive(Debug, Parser)]
#[command(
    name = "promptfan",
    about = "Fan one prompt out to many LLM providers",
    version = VERSION,
    after_help = ROOT_HELP_EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(
        about = "Dispatch a prompt to the selected models",
        after_help = ASK_HELP_EXAMPLES
    )]
    Ask(AskArgs),
    #[command(about = "Authenticate a paid backend token")]
    Auth(AuthArgs),
    #[command(about = "List the model catalog and key availability")]
    Models,
    #[command(about = "Manage local config")]
    Config(ConfigArgs),
    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn print_completion(shell: CompletionShell) {
    let mut cmd = Cli::command();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, "promptfan", &mut io::stdout()),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, "promptfan", &mut io::stdout()),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, "promptfan", &mut io::stdout()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ask(args) => ask::run(args).await,
        Commands::Auth(args) => auth::run(args).await,
        Commands::Models => models::run(),
        Commands::Config(args) => config::run(args),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        process::exit(1);
    }
}
