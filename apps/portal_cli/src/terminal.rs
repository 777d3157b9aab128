use std::{
    io::{self, BufRead, Write},
    sync::Mutex,
};

use client_core::{Notice, NoticeLevel, ProfileView, ResourceListView, UiSurface, View};
use tracing::debug;

/// Prints notices and renders to the terminal. Navigation is recorded so the
/// caller can follow it once the command returns.
pub struct TerminalUi {
    assume_yes: bool,
    navigation: Mutex<Option<View>>,
}

impl TerminalUi {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            navigation: Mutex::new(None),
        }
    }

    pub fn take_navigation(&self) -> Option<View> {
        self.navigation.lock().ok().and_then(|mut view| view.take())
    }
}

impl UiSurface for TerminalUi {
    fn navigate(&self, view: View) {
        match &view {
            View::VerifyEmail { email } => {
                println!("Next: portal verify-email {email} <code>");
            }
            View::Login => println!("Next: portal login <username> <password>"),
            View::ResetPassword => println!("Next: portal reset-password <token> <new-password>"),
            View::Register | View::Profile | View::Objects => {}
        }
        debug!(?view, "navigate");
        if let Ok(mut current) = self.navigation.lock() {
            *current = Some(view);
        }
    }

    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => eprintln!("error: {}", notice.message),
            NoticeLevel::Info | NoticeLevel::Success => println!("{}", notice.message),
        }
    }

    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }

    fn render_profile(&self, profile: &ProfileView) {
        println!("{}", profile.display_name);
        println!("  username: {}", profile.username);
        println!("  email:    {}", profile.email);
        if !profile.roles.is_empty() {
            println!("  roles:    {}", profile.roles.join(", "));
        }
    }

    fn render_resources(&self, list: &ResourceListView) {
        if list.is_empty() {
            return;
        }
        let width = list
            .rows
            .iter()
            .map(|row| row.label.chars().count())
            .max()
            .unwrap_or(0)
            .max("NAME".len());
        println!("{:>6}  {:<width$}  {:<18}  PARENT", "ID", "NAME", "TYPE");
        for row in &list.rows {
            println!(
                "{:>6}  {:<width$}  {:<18}  {}",
                row.id.0,
                row.label,
                row.type_label,
                row.parent_label.as_deref().unwrap_or("-"),
            );
        }
    }

    fn reset_resource_form(&self) {
        debug!("resource form reset");
    }
}
