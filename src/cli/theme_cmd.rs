use serde::Serialize;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::theme::Theme;

use super::{Context, ThemeCommands};

#[derive(Serialize)]
struct ThemeOutput {
    theme: Theme,
    changed: bool,
}

pub fn run_theme(ctx: &Context, action: ThemeCommands, json: bool, quiet: bool) -> Result<()> {
    let mut preference = ctx.theme();
    let before = preference.theme();
    match action {
        ThemeCommands::Show => {}
        ThemeCommands::Toggle => {
            preference.toggle();
        }
        ThemeCommands::Set { theme } => preference.set(theme),
    }

    let theme = preference.theme();
    let mut human = HumanOutput::new(format!("Theme: {theme}"));
    if theme != before {
        human.push_detail(format!("switched from {before}"));
    }

    emit_success(
        OutputOptions { json, quiet },
        "theme",
        &ThemeOutput {
            theme,
            changed: theme != before,
        },
        Some(&human),
    )
}
