use anyhow::Result;
use drs_core::Context;
use rustyline::{error::ReadlineError, DefaultEditor};

fn print_repl_help() {
    eprintln!("Commands: :quit | :q, :help");
}

/// Continue reading when brackets are unbalanced, so multi-line function
/// bodies can be typed naturally.
fn should_continue_multiline(buf: &str) -> bool {
    let mut paren = 0i32;
    let mut brace = 0i32;
    let mut bracket = 0i32;
    let mut in_str: Option<char> = None;
    let mut chars = buf.chars();
    while let Some(c) = chars.next() {
        match in_str {
            Some(quote) => match c {
                '\\' => {
                    let _ = chars.next();
                }
                c if c == quote => in_str = None,
                _ => {}
            },
            None => match c {
                '"' | '\'' => in_str = Some(c),
                '(' => paren += 1,
                ')' => paren -= 1,
                '{' => brace += 1,
                '}' => brace -= 1,
                '[' => bracket += 1,
                ']' => bracket -= 1,
                _ => {}
            },
        }
    }
    paren > 0 || brace > 0 || bracket > 0
}

pub fn run(mut ctx: Context, json: bool) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "drs> " } else { "...> " };
        match editor.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty() {
                    match line.trim() {
                        ":quit" | ":q" => break,
                        ":help" => {
                            print_repl_help();
                            continue;
                        }
                        "" => continue,
                        _ => {}
                    }
                }
                buffer.push_str(&line);
                if should_continue_multiline(&buffer) {
                    buffer.push('\n');
                    continue;
                }
                let input = std::mem::take(&mut buffer);
                editor.add_history_entry(input.as_str())?;
                match ctx.run(&input) {
                    Ok(value) => {
                        if json {
                            println!("{}", serde_json::to_string(&value)?);
                        } else {
                            println!("{value}");
                        }
                        if !ctx.rest_input.is_empty() {
                            eprintln!("unparsed tail: {:?}", ctx.rest_input);
                        }
                    }
                    Err(err) => eprintln!("error: {err}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
