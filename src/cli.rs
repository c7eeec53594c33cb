use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use crate::types::{IssueType, Priority, Role};

#[derive(Parser)]
#[command(name = "taskverse")]
#[command(about = "A CLI for TaskVerse project tracking", version)]
#[command(after_help = "EXAMPLES:
    taskverse issues --mine              List your assigned issues
    taskverse issue show ALPHA-12        Show issue details
    taskverse issue create -t \"Title\"    Create a new issue
    taskverse board move ALPHA-12 \"Done\" Move an issue on the board
    taskverse issue comment ALPHA-12 \"Note\"  Add a comment")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Show full error chains
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Act as this user (email), overriding the configured one
    #[arg(long = "as", value_name = "EMAIL", global = true)]
    pub as_user: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage issues
    #[command(after_help = "EXAMPLES:
    taskverse issue list --mine
    taskverse issue show ALPHA-12
    taskverse issue create -t \"Fix login bug\" --type bug --priority high
    taskverse issue update ALPHA-12 --status \"In Progress\"
    taskverse issue comment ALPHA-12 \"Looks good, @[usr-2:Bob Brown]\"")]
    Issue {
        #[command(subcommand)]
        action: IssueCommands,
    },
    /// List issues (alias for 'issue list')
    #[command(after_help = "EXAMPLES:
    taskverse issues --mine
    taskverse issues --project ALPHA --status \"In Progress\"")]
    Issues(IssueListArgs),
    /// Show the project board, or move an issue on it
    #[command(after_help = "EXAMPLES:
    taskverse board
    taskverse board --project ALPHA
    taskverse board move ALPHA-12 \"In Progress\"")]
    Board(BoardArgs),
    /// List projects
    #[command(after_help = "EXAMPLES:
    taskverse projects
    taskverse projects --org demo-org")]
    Projects {
        /// Organization slug (uses default if not specified)
        #[arg(long)]
        org: Option<String>,
    },
    /// Manage projects
    #[command(after_help = "EXAMPLES:
    taskverse project create \"Mobile App\" --key MOB")]
    Project {
        #[command(subcommand)]
        action: ProjectCommands,
    },
    /// List organization members
    #[command(after_help = "EXAMPLES:
    taskverse members
    taskverse members --org demo-org")]
    Members {
        /// Organization slug (uses default if not specified)
        #[arg(long)]
        org: Option<String>,
    },
    /// Manage organization members
    #[command(after_help = "EXAMPLES:
    taskverse member invite bob@example.com
    taskverse member role bob@example.com admin
    taskverse member remove bob@example.com")]
    Member {
        #[command(subcommand)]
        action: MemberCommands,
    },
    /// List notifications
    #[command(after_help = "EXAMPLES:
    taskverse notifications
    taskverse notifications --read
    taskverse notifications --clear")]
    Notifications {
        /// Mark all notifications as read
        #[arg(long, conflicts_with = "clear")]
        read: bool,

        /// Delete all notifications
        #[arg(long)]
        clear: bool,
    },
    /// Generate shell completions
    #[command(after_help = "EXAMPLES:
    taskverse completions bash > ~/.bash_completion.d/taskverse
    taskverse completions zsh > ~/.zfunc/_taskverse
    taskverse completions fish > ~/.config/fish/completions/taskverse.fish")]
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Initialize configuration and workspace interactively
    #[command(after_help = "EXAMPLES:
    taskverse init")]
    Init,
}

#[derive(Subcommand)]
pub enum IssueCommands {
    /// List issues
    #[command(after_help = "EXAMPLES:
    taskverse issue list --mine
    taskverse issue list --project ALPHA --status \"In Progress\"")]
    List(IssueListArgs),
    /// Show issue details with its timeline
    #[command(after_help = "EXAMPLES:
    taskverse issue show ALPHA-12")]
    Show {
        /// Issue key (e.g., ALPHA-12)
        key: String,
    },
    /// Create a new issue
    #[command(after_help = "EXAMPLES:
    taskverse issue create -t \"Fix login bug\"
    taskverse issue create -t \"New feature\" -d \"Description\" --priority high --assignee me")]
    Create(IssueCreateArgs),
    /// Update an existing issue
    #[command(after_help = "EXAMPLES:
    taskverse issue update ALPHA-12 --status \"Done\"
    taskverse issue update ALPHA-12 --assignee me
    taskverse issue update ALPHA-12 --assignee none --priority low")]
    Update(IssueUpdateArgs),
    /// Add a comment to an issue
    #[command(after_help = "EXAMPLES:
    taskverse issue comment ALPHA-12 \"This is a comment\"
    taskverse issue comment ALPHA-12 \"Over to you, @[usr-2:Bob Brown]\"")]
    Comment(CommentArgs),
    /// Show the activity feed of an issue
    #[command(after_help = "EXAMPLES:
    taskverse issue activity ALPHA-12")]
    Activity {
        /// Issue key (e.g., ALPHA-12)
        key: String,
    },
}

#[derive(Args)]
pub struct BoardArgs {
    #[command(subcommand)]
    pub action: Option<BoardCommands>,

    /// Project key (uses default if not specified)
    #[arg(long)]
    pub project: Option<String>,
}

#[derive(Subcommand)]
pub enum BoardCommands {
    /// Move an issue to another status column
    #[command(after_help = "EXAMPLES:
    taskverse board move ALPHA-12 \"In Progress\"
    taskverse board move ALPHA-12 Done")]
    Move {
        /// Issue key (e.g., ALPHA-12)
        key: String,

        /// Destination status name
        status: String,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a new project with default statuses
    #[command(after_help = "EXAMPLES:
    taskverse project create \"Mobile App\" --key MOB
    taskverse project create \"Backend\" --key API --org demo-org")]
    Create {
        /// Project name
        name: String,

        /// Project key (2-10 uppercase letters or digits)
        #[arg(long, short)]
        key: String,

        /// Organization slug (uses default if not specified)
        #[arg(long)]
        org: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum MemberCommands {
    /// Add an existing user to the organization
    #[command(after_help = "EXAMPLES:
    taskverse member invite bob@example.com
    taskverse member invite carol@example.com --role admin")]
    Invite {
        /// Email of the user to add
        email: String,

        /// Role to grant
        #[arg(long, value_enum, default_value = "member")]
        role: RoleArg,

        /// Organization slug (uses default if not specified)
        #[arg(long)]
        org: Option<String>,
    },
    /// Change a member's role
    #[command(after_help = "EXAMPLES:
    taskverse member role bob@example.com admin")]
    Role {
        /// Email of the member
        email: String,

        /// New role
        #[arg(value_enum)]
        role: RoleArg,

        /// Organization slug (uses default if not specified)
        #[arg(long)]
        org: Option<String>,
    },
    /// Remove a member from the organization
    #[command(after_help = "EXAMPLES:
    taskverse member remove bob@example.com")]
    Remove {
        /// Email of the member
        email: String,

        /// Organization slug (uses default if not specified)
        #[arg(long)]
        org: Option<String>,
    },
}

/// Grantable roles. Owner is fixed at organization creation and never
/// granted, so it is not an accepted value here.
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum RoleArg {
    Admin,
    Member,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Admin => Role::Admin,
            RoleArg::Member => Role::Member,
        }
    }
}

#[derive(Args, Clone)]
pub struct IssueListArgs {
    /// Show only my issues
    #[arg(long)]
    pub mine: bool,

    /// Project key (uses default if not specified)
    #[arg(long)]
    pub project: Option<String>,

    /// Filter by status name (substring, case-insensitive)
    #[arg(long)]
    pub status: Option<String>,

    /// Filter by issue type
    #[arg(long = "type", value_enum)]
    pub issue_type: Option<IssueType>,

    /// Maximum number of issues to show
    #[arg(long, short, default_value = "50")]
    pub limit: usize,
}

#[derive(Args)]
pub struct IssueCreateArgs {
    /// Issue title
    #[arg(long, short)]
    pub title: String,

    /// Issue description
    #[arg(long, short)]
    pub description: Option<String>,

    /// Project key (uses default if not specified)
    #[arg(long)]
    pub project: Option<String>,

    /// Issue type
    #[arg(long = "type", value_enum, default_value = "task")]
    pub issue_type: IssueType,

    /// Priority
    #[arg(long, value_enum, default_value = "none")]
    pub priority: Priority,

    /// Assign to a member (email, or "me")
    #[arg(long)]
    pub assignee: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub due: Option<String>,

    /// Initial status name (defaults to the first board column)
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Args)]
pub struct IssueUpdateArgs {
    /// Issue key (e.g., ALPHA-12)
    pub key: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New description ("none" clears it)
    #[arg(long)]
    pub description: Option<String>,

    /// New issue type
    #[arg(long = "type", value_enum)]
    pub issue_type: Option<IssueType>,

    /// New priority
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// New due date (YYYY-MM-DD, or "none" to clear)
    #[arg(long, value_name = "DATE")]
    pub due: Option<String>,

    /// Assign to a member (email, "me", or "none" to unassign)
    #[arg(long)]
    pub assignee: Option<String>,

    /// New status name
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Args)]
pub struct CommentArgs {
    /// Issue key (e.g., ALPHA-12)
    pub key: String,

    /// Comment body; mention members with @[user-id:Display Name]
    pub body: String,
}
