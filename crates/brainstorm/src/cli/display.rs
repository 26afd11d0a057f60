//! Display formatting utilities for CLI output

use colored::*;

use crate::endpoints::IdeaView;
use crate::models::Category;
use crate::repository::BatchResult;

/// Wrap text to fit within a specified width
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();

  for paragraph in text.split('\n') {
    if paragraph.trim().is_empty() {
      lines.push(String::new());
      continue;
    }

    let mut current_line = String::new();
    for word in paragraph.split_whitespace() {
      if current_line.is_empty() {
        current_line = word.to_string();
      } else if current_line.len() + 1 + word.len() <= width {
        current_line.push(' ');
        current_line.push_str(word);
      } else {
        lines.push(current_line);
        current_line = word.to_string();
      }
    }

    if !current_line.is_empty() {
      lines.push(current_line);
    }
  }

  lines
}

fn category_label(category: Category) -> ColoredString {
  match category {
    Category::Features => category.as_str().green().bold(),
    Category::Ui => category.as_str().magenta().bold(),
    Category::Optimization => category.as_str().yellow().bold(),
    Category::Integration => category.as_str().blue().bold(),
    Category::Custom => category.as_str().cyan().bold(),
  }
}

/// Print generated idea text under a header
pub fn display_ideas(id: &str, category: Category, ideas: &str) {
  println!("=== {} {} ===", category_label(category), id.dimmed());
  for line in wrap_text(ideas, 80) {
    println!("{line}");
  }
  println!();
}

/// Print one stored idea record
pub fn display_idea(idea: &IdeaView) {
  let star = if idea.starred { "★".yellow().to_string() } else { "☆".dimmed().to_string() };
  let origin = match &idea.user_id {
    Some(user) => format!("on demand by {user}"),
    None => "scheduled".to_string(),
  };

  println!(
    "{} {} {} {}",
    star,
    category_label(idea.category),
    idea.id.dimmed(),
    format!("{} ({origin})", idea.generated_at.format("%Y-%m-%d %H:%M UTC")).dimmed()
  );
  for line in wrap_text(&idea.ideas, 78) {
    println!("  {line}");
  }
  println!();
}

/// Print the outcome of a batch run
pub fn display_batch_result(result: &BatchResult) {
  for category in &result.succeeded {
    println!("{} {}", "✓".green(), category_label(*category));
  }
  for category in &result.failed {
    println!("{} {}", "✗".red(), category_label(*category));
  }
  println!(
    "{} succeeded, {} failed, {} stale ideas cleaned up",
    result.succeeded.len().to_string().green(),
    result.failed.len().to_string().red(),
    result.cleaned_up.to_string().cyan()
  );
}
