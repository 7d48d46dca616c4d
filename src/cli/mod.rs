use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};

use crate::application::{AppError, ExpenseDraft, ExpenseStore};
use crate::config::{Config, DEFAULT_DATABASE};
use crate::domain::{format_cents, Category, Expense, ExpenseId};
use crate::io::Exporter;
use crate::storage::{SlotRepository, SlotStore};

/// ExpTrak - Personal Expense Tracker
#[derive(Parser)]
#[command(name = "exptrak")]
#[command(about = "Track your expenses and see where the money goes")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "EXPTRAK_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Refuse writes that would store more than this many bytes
    #[arg(long, env = "EXPTRAK_QUOTA_BYTES")]
    pub quota_bytes: Option<usize>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Record a new expense
    Add {
        /// Amount spent (e.g., "12.50" or "12")
        amount: String,

        /// Category: Food, Transportation, Entertainment, Rent, Other
        #[arg(short, long)]
        category: String,

        /// Date of the expense (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Edit an existing expense; omitted fields keep their current value
    Update {
        /// Expense ID
        id: String,

        /// New amount
        #[arg(short, long)]
        amount: Option<String>,

        /// New category
        #[arg(short, long)]
        category: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// New description (pass "" to clear it)
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete an expense
    Remove {
        /// Expense ID
        id: String,
    },

    /// List expenses in the order they were recorded
    List {
        /// Only show this category
        #[arg(short, long)]
        category: Option<String>,

        /// Show at most this many (the most recent ones)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the most recently recorded expenses
    Recent {
        /// Number of expenses to show
        #[arg(short = 'n', long, default_value = "5")]
        count: usize,
    },

    /// Total spending and breakdown by category
    Summary {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// List the available categories
    Categories,

    /// Export expenses to CSV or JSON
    Export {
        /// Format: csv, json
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

impl Cli {
    pub fn config(&self) -> Config {
        Config {
            database: self.database.clone(),
            quota_bytes: self.quota_bytes,
        }
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config();

        match self.command {
            Commands::Init => {
                config.init_storage().await?;
                println!("Database initialized: {}", config.database);
            }

            Commands::Add {
                amount,
                category,
                date,
                description,
            } => {
                let mut store = open_store(&config).await?;
                let draft = ExpenseDraft {
                    amount,
                    category,
                    date,
                    description: description.unwrap_or_default(),
                };
                let expense = store.add(draft.validate()?).await?;
                println!(
                    "Recorded expense: {} {} on {} ({})",
                    format_cents(expense.amount),
                    expense.category_label(),
                    expense.date,
                    expense.id
                );
            }

            Commands::Update {
                id,
                amount,
                category,
                date,
                description,
            } => {
                let mut store = open_store(&config).await?;
                let id = parse_id(&id)?;
                let changes = ExpenseChanges {
                    amount,
                    category,
                    date,
                    description,
                };
                let updated = update_expense(&mut store, id, changes).await?;
                println!(
                    "Updated expense {}: {} {} on {}",
                    id,
                    format_cents(updated.amount),
                    updated.category_label(),
                    updated.date
                );
            }

            Commands::Remove { id } => {
                let mut store = open_store(&config).await?;
                let id = parse_id(&id)?;
                remove_expense(&mut store, id).await?;
                println!("Removed expense {}", id);
            }

            Commands::List { category, limit } => {
                let store = open_store(&config).await?;
                run_list_command(&store, category, limit)?;
            }

            Commands::Recent { count } => {
                let store = open_store(&config).await?;
                let recent = store.recent(count);
                if recent.is_empty() {
                    println!("Start tracking your spending!");
                } else {
                    print_expenses(recent.iter());
                }
            }

            Commands::Summary { format } => {
                let store = open_store(&config).await?;
                run_summary_command(&store, &format)?;
            }

            Commands::Categories => {
                let store = open_store(&config).await?;
                for category in store.categories() {
                    println!("{}", category);
                }
            }

            Commands::Export { format, output } => {
                let store = open_store(&config).await?;
                run_export_command(&store, &format, output)?;
            }
        }

        Ok(())
    }
}

/// Field edits for `update`; `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct ExpenseChanges {
    pub amount: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
}

/// Draft of `current` with `changes` laid over it.
pub fn merge_draft(current: &Expense, changes: ExpenseChanges) -> ExpenseDraft {
    let mut draft = ExpenseDraft::from_expense(current);
    if let Some(amount) = changes.amount {
        draft.amount = amount;
    }
    if let Some(category) = changes.category {
        draft.category = category;
    }
    if let Some(date) = changes.date {
        draft.date = date;
    }
    if let Some(description) = changes.description {
        draft.description = description;
    }
    draft
}

/// Apply `changes` to the stored expense `id`, validating the merged result.
pub async fn update_expense<S: SlotStore>(
    store: &mut ExpenseStore<S>,
    id: ExpenseId,
    changes: ExpenseChanges,
) -> Result<Expense, AppError> {
    let current = store.get(id).ok_or(AppError::ExpenseNotFound(id))?;
    let updated = Expense::from_new(id, merge_draft(current, changes).validate()?);
    if !store.update(updated.clone()).await? {
        return Err(AppError::ExpenseNotFound(id));
    }
    Ok(updated)
}

/// Remove the stored expense `id`, reporting a missing id as an error.
pub async fn remove_expense<S: SlotStore>(
    store: &mut ExpenseStore<S>,
    id: ExpenseId,
) -> Result<(), AppError> {
    if !store.remove(id).await? {
        return Err(AppError::ExpenseNotFound(id));
    }
    Ok(())
}

async fn open_store(config: &Config) -> Result<ExpenseStore<SlotRepository>> {
    config.open_store().await.with_context(|| {
        format!(
            "Cannot open '{}' (run 'exptrak init' to create it)",
            config.database
        )
    })
}

fn parse_id(id: &str) -> Result<ExpenseId> {
    id.parse()
        .with_context(|| format!("Invalid expense ID '{}' (expected a number)", id))
}

fn run_list_command<S: SlotStore>(
    store: &ExpenseStore<S>,
    category: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let category = category
        .map(|c| {
            Category::parse(&c).with_context(|| format!("Unknown category '{}'", c))
        })
        .transpose()?;

    let mut matching: Vec<&Expense> = store
        .expenses()
        .iter()
        .filter(|e| category.is_none() || e.category == category)
        .collect();

    if let Some(limit) = limit {
        let skip = matching.len().saturating_sub(limit);
        matching.drain(..skip);
    }

    if matching.is_empty() {
        println!("No expenses found.");
    } else {
        print_expenses(matching.into_iter());
    }
    Ok(())
}

fn run_summary_command<S: SlotStore>(store: &ExpenseStore<S>, format: &str) -> Result<()> {
    let summary = store.summary();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        "table" => {
            println!("Total Expenses: {}", format_cents(summary.total));
            println!("Recorded:       {}", summary.count);
            println!();

            if summary.categories.is_empty() {
                println!("No expenses to summarize.");
                return Ok(());
            }

            println!("{:<16} {:>12} {:>6} {:>7}", "CATEGORY", "TOTAL", "COUNT", "SHARE");
            println!("{}", "-".repeat(44));
            for cat in &summary.categories {
                println!(
                    "{:<16} {:>12} {:>6} {:>6.1}%",
                    cat.category,
                    format_cents(cat.total),
                    cat.count,
                    cat.percentage
                );
            }
        }
        other => anyhow::bail!("Unknown format '{}'. Use: table, json", other),
    }
    Ok(())
}

fn run_export_command<S: SlotStore>(
    store: &ExpenseStore<S>,
    format: &str,
    output: Option<String>,
) -> Result<()> {
    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create '{}'", path))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let exporter = Exporter::new(store.expenses());
    let count = match format {
        "csv" => exporter.export_csv(writer)?,
        "json" => exporter.export_json(writer)?.expenses.len(),
        other => anyhow::bail!("Unknown export format '{}'. Use: csv, json", other),
    };

    if let Some(path) = output {
        eprintln!("Exported {} expense(s) to {}", count, path);
    }
    Ok(())
}

fn print_expenses<'a>(expenses: impl Iterator<Item = &'a Expense>) {
    println!(
        "{:<15} {:<12} {:>10} {:<15} DESCRIPTION",
        "ID", "DATE", "AMOUNT", "CATEGORY"
    );
    println!("{}", "-".repeat(70));
    for expense in expenses {
        println!(
            "{:<15} {:<12} {:>10} {:<15} {}",
            expense.id,
            expense.date.format("%Y-%m-%d"),
            format_cents(expense.amount),
            expense.category_label(),
            truncate(expense.description.as_deref().unwrap_or(""), 30)
        );
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
