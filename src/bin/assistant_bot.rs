use std::io::{BufRead, Write};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
enum BotError {
    #[error("Not enough arguments. Input: {0}")]
    MissingArgs(&'static str),
    #[error("Name already exists")]
    Duplicate,
    #[error("Can't find {0} name")]
    UnknownContact(String),
}

/// Contacts in insertion order.
#[derive(Debug, Default)]
struct Contacts {
    entries: Vec<(String, String)>,
}

impl Contacts {
    fn phone(&self, name: &str) -> Option<&str> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, p)| p.as_str())
    }

    fn phone_mut(&mut self, name: &str) -> Option<&mut String> {
        self.entries.iter_mut().find(|(n, _)| n == name).map(|(_, p)| p)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Text(String),
    Exit,
}

/// Runs `op`, turning a failure into `[<name>] <message>`.
fn input_error(name: &str, op: impl FnOnce() -> Result<String, BotError>) -> String {
    op().unwrap_or_else(|e| format!("[{}] {}", name, e))
}

/// Splits `<name words...> <phone>`.
fn name_and_phone(tokens: &[&str]) -> Option<(String, String)> {
    match tokens {
        [name @ .., phone] if !name.is_empty() => Some((name.join(" "), phone.to_string())),
        _ => None,
    }
}

fn add_contact(tokens: &[&str], contacts: &mut Contacts) -> Result<String, BotError> {
    let (name, phone) = name_and_phone(tokens).ok_or(BotError::MissingArgs("add <name> <phone>"))?;
    if contacts.phone(&name).is_some() { return Err(BotError::Duplicate); }
    let msg = format!("Added {} with phone {}", name, phone);
    contacts.entries.push((name, phone));
    Ok(msg)
}

fn change_contact(tokens: &[&str], contacts: &mut Contacts) -> Result<String, BotError> {
    let (name, phone) = name_and_phone(tokens).ok_or(BotError::MissingArgs("change <name> <phone>"))?;
    let slot = contacts.phone_mut(&name).ok_or_else(|| BotError::UnknownContact(name.clone()))?;
    *slot = phone;
    Ok(format!("Updated {} with phone {}", name, slot))
}

fn show_phone(tokens: &[&str], contacts: &Contacts) -> Result<String, BotError> {
    if tokens.is_empty() { return Err(BotError::MissingArgs("phone <name>")); }
    let name = tokens.join(" ");
    Ok(match contacts.phone(&name) {
        Some(p) => format!("Name: {}, phone: {}", name, p),
        None => format!("Can't find {} name", name),
    })
}

fn show_all(contacts: &Contacts) -> String {
    if contacts.entries.is_empty() { return "No contacts".to_string(); }
    contacts.entries.iter().map(|(n, p)| format!("{} : {}", n, p)).collect::<Vec<_>>().join("\n")
}

fn dispatch(line: &str, contacts: &mut Contacts) -> Reply {
    let mut words = line.split_whitespace();
    let command = words.next().map(str::to_lowercase).unwrap_or_default();
    let tokens: Vec<&str> = words.collect();
    let text = match command.as_str() {
        "hello" => "How can I help you?".to_string(),
        "add" => input_error("add_contact", || add_contact(&tokens, contacts)),
        "change" => input_error("change_contact", || change_contact(&tokens, contacts)),
        "phone" => input_error("show_phone", || show_phone(&tokens, contacts)),
        "all" => show_all(contacts),
        "exit" | "quit" => return Reply::Exit,
        _ => "Invalid command.".to_string(),
    };
    Reply::Text(text)
}

fn run_repl(input: impl BufRead, mut out: impl Write, contacts: &mut Contacts) -> std::io::Result<()> {
    writeln!(out, "Welcome to the assistant bot!")?;
    let mut lines = input.lines();
    loop {
        write!(out, "Enter command: ")?;
        out.flush()?;
        let Some(line) = lines.next().transpose()? else { break };
        log::debug!("command line: {:?}", line);
        match dispatch(&line, contacts) {
            Reply::Text(t) => writeln!(out, "{}", t)?,
            Reply::Exit => break,
        }
    }
    writeln!(out, "Good bye!")?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let mut contacts = Contacts::default();
    let stdin = std::io::stdin();
    run_repl(stdin.lock(), std::io::stdout(), &mut contacts)?;
    log::debug!("session ended with {} contacts", contacts.entries.len());
    Ok(())
}
