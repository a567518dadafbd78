use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Which key map applies; the quiz screen needs raw characters for typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Home,
    Learn,
    Quiz,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Back,
    Up,
    Down,
    StartLearn,
    StartQuiz,
    SwitchDirection,
    Flip,
    Next,
    Prev,
    Type(char),
    Erase,
    Enter,
    Retry,
    None,
}

pub fn map_event(ev: Event, mode: Mode) -> Action {
    let Event::Key(KeyEvent { code, modifiers, kind, .. }) = ev else {
        return Action::None;
    };
    if kind == KeyEventKind::Release {
        return Action::None;
    }
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    match mode {
        Mode::Home => match code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Up | KeyCode::Char('k') => Action::Up,
            KeyCode::Down | KeyCode::Char('j') => Action::Down,
            KeyCode::Enter | KeyCode::Char('l') => Action::StartLearn,
            KeyCode::Char('t') => Action::StartQuiz,
            KeyCode::Char('d') => Action::SwitchDirection,
            _ => Action::None,
        },
        Mode::Learn => match code {
            KeyCode::Char('q') | KeyCode::Esc => Action::Back,
            KeyCode::Char(' ') | KeyCode::Enter | KeyCode::Char('f') => Action::Flip,
            KeyCode::Right | KeyCode::Char('n') | KeyCode::Char('l') => Action::Next,
            KeyCode::Left | KeyCode::Char('p') | KeyCode::Char('h') => Action::Prev,
            _ => Action::None,
        },
        Mode::Quiz => match code {
            KeyCode::Esc => Action::Back,
            KeyCode::Enter => Action::Enter,
            KeyCode::Backspace => Action::Erase,
            KeyCode::Char(c) => Action::Type(c),
            _ => Action::None,
        },
        Mode::Finished => match code {
            KeyCode::Char('r') => Action::Retry,
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter => Action::Back,
            _ => Action::None,
        },
    }
}
