//! jira2gh: migrate Jira tickets to GitHub issues.
//!
//! Usage:
//!   jira2gh convert -f ticket.txt                # markup to markdown, stdout
//!   jira2gh create -U https://example.atlassian.net -u <user> -j <jira token> \
//!       -g <github token> -r owner/repo -p TM -l 'Help Wanted,Tech/Go' 19977 12345
//!   jira2gh sync-help-wanted -U <url> -u <user> -j <token> -g <token> \
//!       -r owner/repo -p TM -w <webhook url>
//!   jira2gh label -g <token> -r owner/repo -l 'Help Wanted' 4242

use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use jira2gh::converter::MarkupConverter;
use jira2gh::github::{intersect_labels, GithubClient, Repo};
use jira2gh::jira::{JiraClient, JiraConfig};
use jira2gh::migrate::{MigrateStats, Migrator};
use jira2gh::webhook;

#[derive(Parser)]
#[command(name = "jira2gh")]
#[command(about = "Migrate Jira tickets to GitHub issues")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct JiraOpts {
    /// Base URL of the Jira instance, e.g. https://example.atlassian.net
    #[arg(short = 'U', long)]
    jira_url: String,

    /// Username to authenticate against Jira
    #[arg(short = 'u', long)]
    jira_username: String,

    /// API token to authenticate against Jira
    #[arg(short = 'j', long)]
    jira_token: String,

    /// Project key the tickets live under, e.g. TM
    #[arg(short = 'p', long)]
    project: String,

    /// Jira custom field that stores the linked GitHub issue URL
    #[arg(long, default_value = "customfield_10039")]
    github_link_field: String,
}

impl JiraOpts {
    fn into_config(self) -> JiraConfig {
        JiraConfig {
            base_url: self.jira_url.trim_end_matches('/').to_string(),
            username: self.jira_username,
            token: self.jira_token,
            project: self.project,
            github_link_field: self.github_link_field,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert Jira wiki markup to Markdown
    Convert {
        /// Input file (reads from stdin if not specified)
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,

        /// Output file (writes to stdout if not specified)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Print per-rule substitution counts to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Create GitHub issues from a list of ticket numbers
    Create {
        #[command(flatten)]
        jira: JiraOpts,

        /// Token used to authenticate against GitHub
        #[arg(short = 'g', long)]
        github_token: String,

        /// Repository to create the issues in, e.g. mattermost/mattermost-server
        #[arg(short, long)]
        repo: Repo,

        /// Labels to set on the created issues (comma separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        labels: Vec<String>,

        /// Print what would be created without creating anything
        #[arg(long)]
        dry_run: bool,

        /// Ticket numbers to migrate
        #[arg(required = true)]
        numbers: Vec<String>,
    },

    /// Migrate open help-wanted tickets that have no GitHub issue yet
    SyncHelpWanted {
        #[command(flatten)]
        jira: JiraOpts,

        /// Token used to authenticate against GitHub
        #[arg(short = 'g', long)]
        github_token: String,

        /// Repository to create the issues in
        #[arg(short, long)]
        repo: Repo,

        /// Fix version that marks tickets as up for grabs
        #[arg(long, default_value = "Help Wanted")]
        fix_version: String,

        /// Webhook URL to send the run log to
        #[arg(short, long)]
        webhook_url: Option<String>,

        /// Print what would be created without creating anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Add labels to existing GitHub issues
    Label {
        /// Token used to authenticate against GitHub
        #[arg(short = 'g', long)]
        github_token: String,

        /// Repository containing the issues
        #[arg(short, long)]
        repo: Repo,

        /// Labels to add (comma separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        labels: Vec<String>,

        /// Print what would be labeled without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Issue numbers to label
        #[arg(required = true)]
        numbers: Vec<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    simplelog::TermLogger::init(
        log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    match cli.command {
        Commands::Convert {
            file,
            output,
            stats,
        } => run_convert(file, output, stats),

        Commands::Create {
            jira,
            github_token,
            repo,
            labels,
            dry_run,
            numbers,
        } => {
            let jira = JiraClient::new(jira.into_config());
            let issues = jira.search_by_numbers(&numbers).await?;
            if issues.is_empty() {
                log::warn!("no matching tickets found");
                return Ok(());
            }
            log::info!("found {} ticket(s)", issues.len());

            let github = GithubClient::new(&github_token)?;
            let migrator = Migrator::new(jira, github, repo, labels, dry_run);
            let stats = migrator.run(&issues).await?;
            print_stats(&stats, dry_run);
            Ok(())
        }

        Commands::SyncHelpWanted {
            jira,
            github_token,
            repo,
            fix_version,
            webhook_url,
            dry_run,
        } => {
            let jira = JiraClient::new(jira.into_config());
            let issues = jira.search_help_wanted(&fix_version).await?;
            if issues.is_empty() {
                log::info!("no tickets to sync");
                return Ok(());
            }
            log::info!("found {} ticket(s) to sync", issues.len());

            let github = GithubClient::new(&github_token)?;
            let labels = vec!["Help Wanted".to_string(), "Up For Grabs".to_string()];
            let migrator = Migrator::new(jira, github, repo, labels, dry_run);
            let stats = migrator.run(&issues).await?;
            print_stats(&stats, dry_run);

            let summary = stats.summary();
            if summary.is_empty() {
                return Ok(());
            }
            match webhook_url {
                Some(url) => {
                    // A lost notification does not fail the run.
                    if let Err(e) = webhook::post_text(&url, &summary).await {
                        log::warn!("unable to send run log to webhook: {:#}", e);
                    }
                }
                None => print!("{}", summary),
            }
            Ok(())
        }

        Commands::Label {
            github_token,
            repo,
            labels,
            dry_run,
            numbers,
        } => run_label(&github_token, &repo, &labels, dry_run, &numbers).await,
    }
}

fn run_convert(file: Option<PathBuf>, output: Option<PathBuf>, stats: bool) -> Result<()> {
    let text = match &file {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let converter = MarkupConverter::new();
    let (markdown, counts) = converter.convert_with_stats(Some(text.as_str()));

    match &output {
        Some(path) => {
            let mut writer = BufWriter::new(fs::File::create(path)?);
            writer.write_all(markdown.as_bytes())?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            writer.write_all(markdown.as_bytes())?;
            writer.flush()?;
        }
    }

    if stats {
        if counts.is_empty() {
            eprintln!("no rule matched");
        } else {
            eprint!("{}", counts.to_text());
        }
    }
    Ok(())
}

async fn run_label(
    github_token: &str,
    repo: &Repo,
    labels: &[String],
    dry_run: bool,
    numbers: &[u64],
) -> Result<()> {
    let github = GithubClient::new(github_token)?;

    let existing = github.list_labels(repo).await?;
    let resolved = intersect_labels(labels, &existing);
    for requested in labels {
        if !resolved.contains(requested) {
            log::warn!("label {:?} does not exist in {}, skipping it", requested, repo);
        }
    }
    if resolved.is_empty() {
        anyhow::bail!("none of the requested labels exist in {}", repo);
    }

    let mut failed = 0usize;
    for number in numbers {
        let issue = match github.get_issue(repo, *number).await {
            Ok(issue) => issue,
            Err(e) => {
                log::warn!("{:#}", e);
                failed += 1;
                continue;
            }
        };

        if dry_run {
            println!("Would label {} with {:?}", issue.html_url, resolved);
            continue;
        }
        match github.add_labels(repo, *number, &resolved).await {
            Ok(()) => log::info!("labeled {}", issue.html_url),
            Err(e) => {
                log::warn!("{:#}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} issue(s) could not be labeled", failed);
    }
    Ok(())
}

fn print_stats(stats: &MigrateStats, dry_run: bool) {
    println!();
    if dry_run {
        println!("Would create {} issue(s)", stats.skipped);
        return;
    }
    println!("Migration complete:");
    println!("  created: {}", stats.created);
    println!("  failed:  {}", stats.errors.len());
    if !stats.errors.is_empty() {
        println!();
        println!("Errors:");
        for error in &stats.errors {
            println!("  - {}", error);
        }
    }
}
