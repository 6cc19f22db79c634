use std::{
    env,
    io::{stdout, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use lib::{
    commit::{Commit, Person},
    database::hash_blob,
    dot_git::DotGit,
    object::ObjectKind,
    object_id::ObjectId,
    tree::{Tree, TreeEntry},
    Result,
};

#[derive(Parser, Debug)]
struct Arguments {
    #[arg(long, global = true, default_value = ".git", help = "metadata directory")]
    git_dir: PathBuf,
    #[arg(long, global = true, default_value = ".", help = "directory to snapshot")]
    work_tree: PathBuf,
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(about = "create an empty object database")]
    Init,
    #[clap(about = "compute the blob id of a file")]
    HashObject {
        #[arg(short, help = "also write the blob into the database")]
        write: bool,
        file: PathBuf,
    },
    #[clap(about = "show the content, kind or size of an object")]
    CatFile {
        #[arg(short, help = "pretty-print the content (default)")]
        pretty: bool,
        #[arg(short = 't', conflicts_with_all = ["pretty", "size"], help = "show the kind")]
        kind: bool,
        #[arg(short, conflicts_with_all = ["pretty", "kind"], help = "show the content size")]
        size: bool,
        object: String,
    },
    #[clap(about = "list the entries of a tree")]
    LsTree {
        #[arg(long, help = "list only entry names")]
        name_only: bool,
        #[arg(long, conflicts_with = "name_only", help = "print entries as JSON")]
        json: bool,
        tree: String,
    },
    #[clap(about = "record the working tree as a tree object")]
    WriteTree,
    #[clap(about = "create a commit object for a tree")]
    CommitTree {
        tree: String,
        #[arg(short, help = "parent commit, may be repeated")]
        parent: Vec<String>,
        #[arg(short, long, help = "commit message")]
        message: String,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Arguments::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Arguments) -> Result<()> {
    use Command::*;
    let mut out = stdout().lock();
    match args.cmd {
        Init => {
            let dot_git = DotGit::init(args.git_dir)?;
            writeln!(out, "Initialized object database in {:?}", dot_git.root())?;
        }
        HashObject { write, file } => {
            let id = if write {
                DotGit::existing(args.git_dir)?
                    .database()
                    .create_blob(&file)?
            } else {
                hash_blob(&file)?
            };
            writeln!(out, "{}", id)?;
        }
        CatFile {
            kind, size, object, ..
        } => {
            let db = DotGit::existing(args.git_dir)?.database();
            let (found, content) = db.read_object(&object)?;
            if kind {
                writeln!(out, "{}", found)?;
            } else if size {
                writeln!(out, "{}", content.len())?;
            } else if found == ObjectKind::Tree {
                for entry in Tree::decode(&content)?.entries {
                    print_entry(&mut out, &entry)?;
                }
            } else {
                out.write_all(&content)?;
            }
        }
        LsTree {
            name_only,
            json,
            tree,
        } => {
            let entries = DotGit::existing(args.git_dir)?
                .database()
                .list_tree_entries(&tree)?;
            if json {
                serde_json::to_writer_pretty(&mut out, &entries)?;
                writeln!(out)?;
            } else {
                for entry in &entries {
                    if name_only {
                        writeln!(out, "{}", entry.name)?;
                    } else {
                        print_entry(&mut out, entry)?;
                    }
                }
            }
        }
        WriteTree => {
            let dot_git = DotGit::existing(args.git_dir)?;
            let ignores = dot_git.ignores()?;
            let id = dot_git.database().create_tree(&args.work_tree, &ignores)?;
            writeln!(out, "{}", id)?;
        }
        CommitTree {
            tree,
            parent,
            message,
        } => {
            let tree: ObjectId = tree.parse()?;
            let parents = parent
                .iter()
                .map(|p| p.parse())
                .collect::<Result<Vec<ObjectId>>>()?;
            let commit = Commit {
                tree,
                parents,
                author: identity("AUTHOR"),
                committer: identity("COMMITTER"),
                message,
            };
            let id = DotGit::existing(args.git_dir)?
                .database()
                .create_commit(&commit)?;
            writeln!(out, "{}", id)?;
        }
    }
    Ok(())
}

fn print_entry(out: &mut impl Write, entry: &TreeEntry) -> Result<()> {
    writeln!(
        out,
        "{:0>6} {} {}\t{}",
        entry.mode.as_str(),
        entry.mode.object_kind(),
        entry.id,
        entry.name
    )?;
    Ok(())
}

/// Reads `GIT_<role>_NAME` and `GIT_<role>_EMAIL`, stamped with the current time.
fn identity(role: &str) -> Person {
    let name = env::var(format!("GIT_{}_NAME", role)).unwrap_or_else(|_| String::from("odb"));
    let email =
        env::var(format!("GIT_{}_EMAIL", role)).unwrap_or_else(|_| String::from("odb@localhost"));
    Person::now(name, email)
}
