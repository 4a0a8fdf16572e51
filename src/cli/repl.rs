/// One line typed into the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Files,
    Open(String),
    Show,
    Preview,
    History,
    Replace { path: String, local: String },
    Save(String),
    Export(Option<String>),
    Publish(Option<String>),
    New(String),
    SignIn { email: String, password: String },
    SignUp { name: String, email: String, password: String },
    SignOut,
    Quit,
    /// Free text for the assistant.
    Edit(String),
    Blank,
    /// A `:command` that was misspelled or missing arguments; carries the usage line.
    Invalid(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplCommand::Blank;
        }
        let Some(rest) = line.strip_prefix(':') else {
            return ReplCommand::Edit(line.to_string());
        };
        let (cmd, tail) = match rest.split_once(char::is_whitespace) {
            Some((c, t)) => (c, t.trim()),
            None => (rest, ""),
        };
        let words: Vec<&str> = tail.split_whitespace().collect();
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());

        match (cmd, words.as_slice()) {
            ("help" | "h" | "?", _) => ReplCommand::Help,
            ("files" | "ls", _) => ReplCommand::Files,
            ("open", [path]) => ReplCommand::Open(path.to_string()),
            ("open", _) => ReplCommand::Invalid(":open <path>".into()),
            ("show", _) => ReplCommand::Show,
            ("preview", _) => ReplCommand::Preview,
            ("history", _) => ReplCommand::History,
            ("replace", [path, local]) => {
                ReplCommand::Replace { path: path.to_string(), local: local.to_string() }
            }
            ("replace", _) => ReplCommand::Invalid(":replace <path> <local-file>".into()),
            ("save", [dir]) => ReplCommand::Save(dir.to_string()),
            ("save", _) => ReplCommand::Invalid(":save <dir>".into()),
            ("export", _) => ReplCommand::Export(opt(tail)),
            ("publish", _) => ReplCommand::Publish(opt(tail)),
            ("new", _) if !tail.is_empty() => ReplCommand::New(tail.to_string()),
            ("new", _) => ReplCommand::Invalid(":new <prompt>".into()),
            ("signin", [email, password]) => {
                ReplCommand::SignIn { email: email.to_string(), password: password.to_string() }
            }
            ("signin", _) => ReplCommand::Invalid(":signin <email> <password>".into()),
            ("signup", [name, email, password]) => ReplCommand::SignUp {
                name: name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            },
            ("signup", _) => ReplCommand::Invalid(":signup <name> <email> <password>".into()),
            ("signout", _) => ReplCommand::SignOut,
            ("quit" | "q" | "exit", _) => ReplCommand::Quit,
            (other, _) => ReplCommand::Invalid(format!("unknown command :{other}, try :help")),
        }
    }
}
