//! CLI argument parsing using clap derive

use std::path::PathBuf;

use bundle_core::TagNaming;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Clone Bundler - Assemble and release bundles of repositories
#[derive(Parser, Debug)]
#[command(name = "bundler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Bundle directory
    #[arg(short = 'd', long = "bundle-dir", global = true, default_value = ".")]
    pub bundle_dir: PathBuf,

    #[command(flatten)]
    pub release: ReleaseFlags,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides of the `[release]` configuration.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseFlags {
    /// Release from the tip when a branch has several heads
    #[arg(long, global = true)]
    pub allow_multiple_heads: bool,

    /// Release again products whose history moved without changelog entries
    #[arg(long, global = true)]
    pub release_again: bool,

    /// Bump the major version instead of the minor one for new features
    #[arg(long, global = true)]
    pub increment_major: bool,

    /// Tag naming scheme
    #[arg(long, global = true, value_enum)]
    pub tag_naming: Option<TagNamingArg>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagNamingArg {
    /// `1.2.3`, `1.2.3-2` for later releases of the same version
    Version,
    /// Always `1.2.3-1`
    VersionRelease,
}

impl From<TagNamingArg> for TagNaming {
    fn from(arg: TagNamingArg) -> Self {
        match arg {
            TagNamingArg::Version => TagNaming::Version,
            TagNamingArg::VersionRelease => TagNaming::VersionRelease,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Clone every repository of the bundle that is not cloned yet
    MakeClones,

    /// Update every clone to its tag or branch tip
    UpdateClones,

    /// Rewrite remote URLs of every clone from the manifest
    ClonesRefreshUrl,

    /// List the local path of every clone
    ClonesList {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Report changesets not pushed yet
    ClonesOut {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Release one repository of the bundle
    ReleaseClone {
        /// Target of the repository
        target: String,
    },

    /// Release every repository and record the bundle under a name
    ///
    /// Examples:
    ///   bundler release-bundle 2024.1
    ///   bundler -d bundles/prod release-bundle 2024.1 --tag-naming version-release
    ReleaseBundle {
        /// Name of the bundle release, used as tag
        name: String,
    },

    /// Release several bundles of one working copy together
    ReleaseMultiple {
        /// Name of the release, used as tag
        name: String,

        /// Bundle directories, released in this order
        #[arg(required = true, num_args = 1..)]
        bundles: Vec<PathBuf>,
    },

    /// Export a bundle release into a directory
    Archive {
        /// Bundle release to export
        tag: String,

        /// Output directory, must not exist
        output: PathBuf,
    },

    /// Changelog between two bundle releases
    BundleChangelog {
        /// Older release
        from: String,

        /// Newer release
        to: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        shell: Shell,
    },
}
