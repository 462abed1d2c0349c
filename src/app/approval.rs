//! Approval prompt rendering and decision helpers.

use askterm::approval::{ApprovalChoice, ApprovalDecision};
use askterm::error::ApprovalError;
use askterm::shell::ShellDescriptor;
use crossterm::style::{Color, Stylize};
use std::io::{BufRead, Write};

/// Label naming the shell a command will run in.
pub(crate) fn approval_prompt_actor(descriptor: &ShellDescriptor) -> String {
    format!("{} ({})", descriptor.shell_name(), descriptor.dialect())
}

/// Format command text as a shell snippet block.
pub(crate) fn format_approval_command_block(command: &str) -> String {
    if command.trim().is_empty() {
        return "$".to_string();
    }

    let mut out = String::new();
    for (idx, line) in command.lines().enumerate() {
        if idx > 0 {
            out.push('\n');
            out.push_str("  ");
        } else {
            out.push_str("$ ");
        }
        out.push_str(line);
    }
    out
}

/// Render the request, then read answers until a decision is made.
///
/// `e` asks for a replacement command on the next line.
pub(crate) fn prompt_for_approval<R, W>(
    input: &mut R,
    out: &mut W,
    actor: &str,
    command: &str,
    color: bool,
) -> Result<ApprovalDecision, ApprovalError>
where
    R: BufRead,
    W: Write,
{
    if color {
        writeln!(
            out,
            "{} shell command on {}",
            "•".with(Color::DarkGrey),
            actor.with(Color::White).bold()
        )?;
        writeln!(out, "{}", format_approval_command_block(command).with(Color::Yellow))?;
    } else {
        writeln!(out, "• shell command on {actor}")?;
        writeln!(out, "{}", format_approval_command_block(command))?;
    }

    loop {
        write!(out, "run it? [y]es / [n]o / [e]dit: ")?;
        out.flush()?;
        let answer = read_answer(input)?;
        match ApprovalChoice::parse(&answer) {
            Some(ApprovalChoice::Yes) => return Ok(ApprovalDecision::Approve),
            Some(ApprovalChoice::No) => return Ok(ApprovalDecision::Reject),
            Some(ApprovalChoice::Edit) => {
                write!(out, "replacement command: ")?;
                out.flush()?;
                return Ok(ApprovalDecision::Modify(read_answer(input)?));
            }
            None => writeln!(out, "please answer y, n or e")?,
        }
    }
}

fn read_answer<R: BufRead>(input: &mut R) -> Result<String, ApprovalError> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(ApprovalError::Closed);
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
