//! ivy CLI - content-addressed version control

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use ivy::commands::{add, branch, checkout, commit, diff, init, log, merge, plumbing, status, tag};
use ivy::diff::DiffOptions;
use ivy::repo::Repo;

#[derive(Parser)]
#[command(name = "ivy")]
#[command(about = "content-addressed version control engine")]
#[command(version)]
struct Cli {
    /// repository path (searched upward for the `.ivy` root)
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// create a new repository
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// stage files
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// record a commit of the staged changes
    Commit {
        #[arg(short, long)]
        message: String,
    },

    /// show staged, unstaged, and untracked changes
    Status,

    /// show commit history
    Log {
        #[arg(short = 'n', long)]
        max_count: Option<usize>,

        /// include a unified diff per commit
        #[arg(short, long)]
        patch: bool,

        /// print hashes shortened to this many hex characters
        #[arg(long)]
        abbrev: Option<usize>,
    },

    /// show changes between the working tree, index, and commits
    Diff {
        /// compare the index against HEAD instead of the working tree against the index
        #[arg(long)]
        staged: bool,

        /// summarize insertions/deletions per file instead of printing the patch
        #[arg(long)]
        stat: bool,
    },

    /// list, create, delete, or rename branches
    Branch {
        name: Option<String>,

        /// create starting at this revision instead of HEAD
        #[arg(long)]
        start_point: Option<String>,

        /// delete the branch
        #[arg(short = 'd', long)]
        delete: bool,

        /// force-delete an unmerged branch
        #[arg(short = 'D', long)]
        force_delete: bool,

        /// rename the branch to the given new name
        #[arg(short = 'm', long)]
        rename_to: Option<String>,
    },

    /// switch the working tree and HEAD to a revision
    Checkout { target: String },

    /// merge a revision into the current branch
    Merge {
        target: Option<String>,

        /// abandon an in-progress merge and restore HEAD's tree
        #[arg(long)]
        abort: bool,

        /// merge without creating a commit, leaving the result staged
        #[arg(long)]
        no_commit: bool,
    },

    /// create, list, or delete tags
    Tag {
        name: Option<String>,

        /// tag this revision instead of HEAD
        #[arg(long)]
        target: Option<String>,

        /// create an annotated tag with this message
        #[arg(short = 'a', long)]
        message: Option<String>,

        /// delete the tag
        #[arg(short = 'd', long)]
        delete: bool,
    },

    /// show a commit and its diff
    Show { target: String },

    /// print the contents of an object
    CatFile { object: String },

    /// list the entries of a tree
    LsTree { target: String },

    /// list tracked or working-tree files
    LsFiles {
        /// list only staged paths
        #[arg(short, long)]
        staged: bool,
    },

    /// resolve a revision expression to a hash
    RevParse {
        rev: String,

        /// print the hash shortened to this many hex characters
        #[arg(long)]
        short: Option<usize>,
    },

    /// hash (and optionally store) raw content as a blob
    HashObject {
        path: PathBuf,

        #[arg(short = 'w', long)]
        write: bool,
    },

    /// point a ref at a commit
    UpdateRef { ref_path: String, target: String },

    /// read or rewrite what HEAD points at
    SymbolicRef { target: Option<String> },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ivy::Result<ExitCode> {
    if let Commands::Init { path } = &cli.command {
        let repo = init::init(path)?;
        println!("initialized repository at {}", repo.path().display());
        return Ok(ExitCode::SUCCESS);
    }

    let repo = Repo::discover(&cli.repo)?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        Commands::Add { paths } => {
            let n = add::add(&repo, &paths)?;
            println!("staged {n} path(s)");
        }

        Commands::Commit { message } => {
            let hash = commit::commit(&repo, &message)?;
            println!("{hash}");
        }

        Commands::Status => print_status(&repo)?,

        Commands::Log { max_count, patch, abbrev } => {
            for entry in log::log(&repo, max_count, patch)? {
                match abbrev {
                    Some(len) => println!("commit {}", entry.hash.to_hex_abbrev(len)),
                    None => println!("commit {}", entry.hash),
                }
                println!("Author: {}", entry.commit.author);
                println!("Date:   {}", entry.commit.author.format_date());
                println!();
                for line in entry.commit.message.lines() {
                    println!("    {line}");
                }
                println!();
                if let Some(diff_text) = entry.diff {
                    print!("{diff_text}");
                }
            }
        }

        Commands::Diff { staged, stat } => print_diff(&repo, staged, stat)?,

        Commands::Branch { name, start_point, delete, force_delete, rename_to } => {
            if let Some(new_name) = rename_to {
                let old_name = name.ok_or_else(|| ivy::Error::InvalidRef("branch rename requires a name".to_string()))?;
                branch::rename(&repo, &old_name, &new_name)?;
            } else if delete || force_delete {
                let name = name.ok_or_else(|| ivy::Error::InvalidRef("branch delete requires a name".to_string()))?;
                branch::delete(&repo, &name, force_delete)?;
            } else if let Some(name) = name {
                branch::create(&repo, &name, start_point.as_deref())?;
            } else {
                for b in branch::list(&repo)? {
                    let marker = if b.is_current { "*" } else { " " };
                    println!("{marker} {}", b.name);
                }
            }
        }

        Commands::Checkout { target } => {
            checkout::checkout(&repo, &target)?;
            println!("switched to {target}");
        }

        Commands::Merge { target, abort, no_commit } => {
            if abort {
                merge::abort(&repo)?;
                println!("merge aborted");
                return Ok(ExitCode::SUCCESS);
            }
            let target = target.ok_or_else(|| ivy::Error::InvalidRef("merge requires a target revision".to_string()))?;
            return Ok(print_merge_outcome(merge::merge(&repo, &target, no_commit)?));
        }

        Commands::Tag { name, target, message, delete } => {
            if delete {
                let name = name.ok_or_else(|| ivy::Error::InvalidRef("tag delete requires a name".to_string()))?;
                tag::delete(&repo, &name)?;
            } else if let Some(name) = name {
                let hash = tag::create(&repo, &name, target.as_deref(), message.as_deref())?;
                println!("{hash}");
            } else {
                for t in tag::list(&repo)? {
                    println!("{t}");
                }
            }
        }

        Commands::Show { target } => {
            let entry = plumbing::show(&repo, &target)?;
            println!("commit {}", entry.hash);
            println!("Author: {}", entry.commit.author);
            println!();
            println!("    {}", entry.commit.message);
            println!();
            if let Some(diff_text) = entry.diff {
                print!("{diff_text}");
            }
        }

        Commands::CatFile { object } => {
            let (_, body) = plumbing::cat_file(&repo, &object)?;
            std::io::Write::write_all(&mut std::io::stdout(), &body).map_err(|source| ivy::Error::Io { path: "stdout".into(), source })?;
        }

        Commands::LsTree { target } => {
            for row in plumbing::ls_tree(&repo, &target)? {
                println!("{} {} {}\t{}", row.mode.as_str(), row.kind, row.hash, row.name);
            }
        }

        Commands::LsFiles { staged } => {
            for path in plumbing::ls_files(&repo, staged)? {
                println!("{path}");
            }
        }

        Commands::RevParse { rev, short } => {
            let hash = plumbing::rev_parse(&repo, &rev)?;
            match short {
                Some(len) => println!("{}", hash.to_hex_abbrev(len)),
                None => println!("{hash}"),
            }
        }

        Commands::HashObject { path, write } => {
            let content = std::fs::read(&path).map_err(|source| ivy::Error::Io { path: path.clone(), source })?;
            println!("{}", plumbing::hash_object(&repo, &content, write)?);
        }

        Commands::UpdateRef { ref_path, target } => {
            plumbing::update_ref(&repo, &ref_path, &target)?;
        }

        Commands::SymbolicRef { target } => {
            println!("{}", plumbing::symbolic_ref(&repo, target.as_deref())?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_status(repo: &Repo) -> ivy::Result<()> {
    let report = status::status(repo)?;

    if !report.staged.is_empty() {
        println!("staged:");
        for (path, kind) in &report.staged {
            println!("  {:?}\t{path}", kind);
        }
    }
    if !report.unstaged.is_empty() {
        println!("unstaged:");
        for (path, kind) in &report.unstaged {
            println!("  {:?}\t{path}", kind);
        }
    }
    if !report.untracked.is_empty() {
        println!("untracked:");
        for path in &report.untracked {
            println!("  {path}");
        }
    }
    if report.staged.is_empty() && report.unstaged.is_empty() && report.untracked.is_empty() {
        println!("nothing to commit, working tree clean");
    }
    Ok(())
}

fn print_diff(repo: &Repo, staged: bool, stat: bool) -> ivy::Result<()> {
    let options = DiffOptions::default();

    if !stat {
        let text = if staged { diff::diff_index_vs_head(repo, &options)? } else { diff::diff_worktree_vs_index(repo, &options)? };
        print!("{text}");
        return Ok(());
    }

    if staged {
        let index = ivy::index::Index::read(repo)?;
        let index_tree = index.build_tree(repo)?;
        for s in diff::stat_trees(repo, head_tree(repo)?, Some(index_tree), &options)? {
            println!("{}\t+{}\t-{}", s.path, s.insertions, s.deletions);
        }
    } else {
        for s in worktree_stat(repo, &options)? {
            println!("{}\t+{}\t-{}", s.path, s.insertions, s.deletions);
        }
    }
    Ok(())
}

/// the tree of the commit HEAD currently resolves to, or `None` before the first commit
fn head_tree(repo: &Repo) -> ivy::Result<Option<ivy::Hash>> {
    match plumbing::rev_parse(repo, "HEAD") {
        Ok(hash) => Ok(Some(ivy::objects::commit::read_commit(repo, &hash)?.tree)),
        Err(ivy::Error::RefNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// per-file insertion/deletion counts between the working tree and the index
fn worktree_stat(repo: &Repo, options: &DiffOptions) -> ivy::Result<Vec<diff::FileStat>> {
    let index = ivy::index::Index::read(repo)?;
    let mut stats = Vec::new();
    for entry in index.entries() {
        if ivy::worktree::path_matches_index(repo, entry)? {
            continue;
        }
        let old_text = String::from_utf8_lossy(&ivy::objects::blob::read_blob(repo, &entry.hash)?).into_owned();
        let new_text = std::fs::read_to_string(repo.path().join(&entry.path)).unwrap_or_default();
        let ops = ivy::diff::diff_lines(&old_text, &new_text, options);
        let insertions = ops.iter().filter(|op| matches!(op, ivy::diff::DiffOp::Insert(_))).count();
        let deletions = ops.iter().filter(|op| matches!(op, ivy::diff::DiffOp::Delete(_))).count();
        stats.push(diff::FileStat { path: entry.path.clone(), insertions, deletions });
    }
    Ok(stats)
}

fn print_merge_outcome(outcome: merge::MergeOutcome) -> ExitCode {
    match outcome {
        merge::MergeOutcome::AlreadyUpToDate => {
            println!("already up to date");
            ExitCode::SUCCESS
        }
        merge::MergeOutcome::FastForward(hash) => {
            println!("fast-forward to {hash}");
            ExitCode::SUCCESS
        }
        merge::MergeOutcome::Merged(hash) => {
            println!("merge commit {hash}");
            ExitCode::SUCCESS
        }
        merge::MergeOutcome::Staged => {
            println!("merge staged, not committed");
            ExitCode::SUCCESS
        }
        merge::MergeOutcome::Conflicts(paths) => {
            eprintln!("merge produced conflicts in {} file(s):", paths.len());
            for path in paths {
                eprintln!("  {path}");
            }
            ExitCode::FAILURE
        }
    }
}
