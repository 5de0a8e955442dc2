mod commands;
mod error;
mod hex;
mod http;
mod object;
mod pack;
mod repo;
mod transport;
mod tree;
mod zlib;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty Git repository
    Init,

    /// Provide content or type and size information for repository objects
    CatFile {
        /// Show object type
        #[arg(short, conflicts_with = "size_only")]
        type_only: bool,

        /// Show object size
        #[arg(short, conflicts_with = "type_only")]
        size_only: bool,

        /// Pretty-print object's content
        #[arg(short, conflicts_with_all = ["size_only", "type_only"])]
        pretty_print: bool,

        /// Object hash
        #[arg(id = "object")]
        hash: String,
    },

    /// Compute object ID and optionally create an object from a file
    HashObject {
        /// Actually write the object into the object database
        #[arg(short)]
        write: bool,

        /// Object type
        #[arg(short, id = "type", default_value = "blob")]
        typ: String,

        #[arg(id = "file")]
        file: String,
    },

    /// List the contents of a tree object
    LsTree {
        /// Recurse into sub-trees
        #[arg(short = 'r')]
        recurse: bool,

        /// List only file names
        #[arg(long)]
        name_only: bool,

        #[arg(id = "tree-ish")]
        hash: String,
    },

    /// Create a tree object from the working directory
    WriteTree,

    /// Create a commit object from a tree and a message
    CommitTree {
        #[arg(id = "tree")]
        tree_hash: String,

        /// Parent commit
        #[arg(short)]
        parent: Option<String>,

        /// Commit message
        #[arg(short)]
        message: String,
    },

    /// Clone a repository over the smart HTTP transport
    Clone {
        /// Repository URL
        repository: String,

        /// Target directory (defaults to the repository's name)
        directory: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    match args.command {
        Commands::Init => commands::init::invoke(),
        Commands::CatFile {
            pretty_print: _,
            type_only,
            size_only,
            hash,
        } => commands::cat_file::invoke(&hash, type_only, size_only),
        Commands::HashObject { write, file, typ: _ } => {
            let hash = commands::hash_object::invoke(&file, write)?;
            println!("{hash}");
            Ok(())
        }
        Commands::LsTree {
            recurse,
            name_only,
            hash,
        } => commands::ls_tree::invoke(&hash, recurse, name_only),
        Commands::WriteTree => {
            let hash = commands::write_tree::invoke()?;
            println!("{hash}");
            Ok(())
        }
        Commands::CommitTree {
            tree_hash,
            parent,
            message,
        } => {
            let hash = commands::commit_tree::invoke(&tree_hash, &message, parent)?;
            println!("{hash}");
            Ok(())
        }
        Commands::Clone {
            repository,
            directory,
        } => commands::clone::invoke(&repository, directory),
    }
}
