use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FocusPane, InputField, InputMode};
use crate::directory::DirectoryStatus;
use crate::reply::ComparisonTable;
use crate::state::{ChatMessage, Sender};
use crate::transcript::{ProductCard, TranscriptEntry};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    // Chat on the left, website directory on the right
    let [chat_area, directory_area] = Layout::horizontal([
        Constraint::Percentage(65),
        Constraint::Percentage(35),
    ])
    .areas(body_area);

    render_chat(app, frame, chat_area);
    render_directory(app, frame, directory_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let context = match app.session.selected_website_id {
        Some(id) => {
            let name = app
                .website_card
                .as_ref()
                .map(|card| card.name.as_str())
                .unwrap_or_default();
            format!(" [website #{} {}]", id, name)
        }
        None => " [no website]".to_string(),
    };

    let title = Line::from(vec![
        Span::styled(" Support Agent ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(context, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(app.client().base_url().to_string(), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    // Brief highlight right after a message is sent
    let send_key_style = if app.send_pulse_active() {
        Style::default().bg(Color::Green).fg(Color::Black).bold()
    } else {
        key_style
    };

    let hints = match (app.input_mode, app.focus) {
        (InputMode::Editing, FocusPane::ChatInput) => vec![
            Span::styled(" Enter ", send_key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        (InputMode::Editing, _) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" register ", label_style),
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        (InputMode::Normal, focus) => {
            let mut hints = vec![
                Span::styled(" Tab ", key_style),
                Span::styled(" focus ", label_style),
            ];
            match focus {
                FocusPane::Transcript => hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" scroll ", label_style),
                    Span::styled(" g/G ", key_style),
                    Span::styled(" top/bottom ", label_style),
                ]),
                FocusPane::Directory => hints.extend(vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" nav ", label_style),
                    Span::styled(" Enter ", key_style),
                    Span::styled(" select ", label_style),
                ]),
                FocusPane::ChatInput | FocusPane::WebsiteInput => hints.extend(vec![
                    Span::styled(" i ", key_style),
                    Span::styled(" edit ", label_style),
                ]),
            }
            hints.extend(vec![
                Span::styled(" a ", key_style),
                Span::styled(" ask ", label_style),
                Span::styled(" w ", key_style),
                Span::styled(" website ", label_style),
                Span::styled(" r ", key_style),
                Span::styled(" reload ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [transcript_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store area and inner size for mouse hit-testing and scroll calculations
    app.transcript_area = Some(transcript_area);
    app.transcript_height = transcript_area.height.saturating_sub(2);
    app.transcript_width = transcript_area.width.saturating_sub(2);

    let focused = app.focus == FocusPane::Transcript;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Chat ({}) ", app.transcript.len()));

    let lines = transcript_lines(app);
    let total_lines = wrapped_height(&lines, app.transcript_width);
    let max_scroll = total_lines.saturating_sub(app.transcript_height);
    if app.follow_tail {
        app.transcript_scroll = max_scroll;
    } else {
        app.transcript_scroll = app.transcript_scroll.min(max_scroll);
    }

    let text = if lines.is_empty() {
        Text::from(Span::styled(
            "Ask the support agent a question...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(lines)
    };

    let transcript = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.transcript_scroll, 0));
    frame.render_widget(transcript, transcript_area);

    let disabled = app.chat_in_flight();
    let title = if disabled {
        " Message (waiting for agent) "
    } else {
        " Message "
    };
    render_input(
        frame,
        input_area,
        &app.chat_input,
        title,
        app.focus == FocusPane::ChatInput,
        app.input_mode == InputMode::Editing && !disabled,
        disabled,
    );
}

fn transcript_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for entry in app.transcript.entries() {
        match entry {
            TranscriptEntry::Message(msg) => push_message(&mut lines, msg),
            TranscriptEntry::Product { product, timestamp } => {
                lines.push(agent_heading(timestamp));
                push_product_card(&mut lines, &ProductCard::from_product(product));
            }
            TranscriptEntry::Comparison { table, timestamp } => {
                lines.push(agent_heading(timestamp));
                push_comparison(&mut lines, table);
            }
        }
        lines.push(Line::default());
    }

    if app.chat_in_flight() {
        lines.push(Line::from(Span::styled(
            "Agent:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn agent_heading(timestamp: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            "Agent:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {}", timestamp), Style::default().fg(Color::DarkGray)),
    ])
}

fn push_message(lines: &mut Vec<Line<'static>>, msg: &ChatMessage) {
    match msg.sender {
        Sender::User => {
            lines.push(Line::from(vec![
                Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" {}", msg.timestamp), Style::default().fg(Color::DarkGray)),
            ]));
            lines.extend(msg.text.lines().map(|line| Line::from(line.to_string())));
        }
        Sender::Agent => {
            lines.push(agent_heading(&msg.timestamp));
            lines.extend(msg.text.lines().map(parse_markdown_line));
        }
    }
}

fn push_product_card(lines: &mut Vec<Line<'static>>, card: &ProductCard) {
    let edge = Style::default().fg(Color::Magenta);

    lines.push(Line::from(vec![
        Span::styled("┌ ", edge),
        Span::styled(card.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
    ]));
    lines.push(Line::from(vec![
        Span::styled("│ ", edge),
        Span::styled(format!("[img] {}", card.image), Style::default().fg(Color::DarkGray)),
    ]));
    for line in card.description.lines() {
        let mut styled = parse_markdown_line(line);
        styled.spans.insert(0, Span::styled("│ ", edge));
        lines.push(styled);
    }

    let mut meta = vec![Span::styled("└ ", edge)];
    if let Some(price) = &card.price {
        meta.push(Span::styled(
            price.clone(),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
        meta.push(Span::raw("  "));
    }
    if let Some(link) = &card.link {
        meta.push(Span::styled(
            format!("↗ View {}", link),
            Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
        ));
    }
    lines.push(Line::from(meta));
}

fn push_comparison(lines: &mut Vec<Line<'static>>, table: &ComparisonTable) {
    let mut rows = table.text_rows().into_iter();

    if let Some(header) = rows.next() {
        let rule = "─".repeat(header.chars().count());
        lines.push(Line::from(Span::styled(
            header,
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(rule, Style::default().fg(Color::DarkGray))));
    }
    lines.extend(rows.map(Line::from));
}

/// Rows the lines occupy once wrapped to `width` columns.
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let wrap_width = if width > 0 { width as usize } else { 50 };
    lines
        .iter()
        .map(|line| {
            let chars = line.width();
            if chars == 0 {
                1
            } else {
                chars.div_ceil(wrap_width)
            }
        })
        .sum::<usize>()
        .min(u16::MAX as usize) as u16
}

fn render_directory(app: &mut App, frame: &mut Frame, area: Rect) {
    let [card_area, list_area, input_area] = Layout::vertical([
        Constraint::Length(5),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    app.directory_area = Some(list_area);

    // Website card
    let card_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Website ");
    let card_text = match &app.website_card {
        Some(card) => Text::from(vec![
            Line::from(Span::styled(card.name.clone(), Style::default().bold())),
            Line::from(Span::styled(
                card.description.clone(),
                Style::default().fg(Color::Gray),
            )),
            Line::from(Span::styled(card.icon_label(), Style::default().fg(Color::DarkGray))),
        ]),
        None => Text::from(Span::styled(
            "Select a website or register a new one.",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(
        Paragraph::new(card_text)
            .block(card_block)
            .wrap(Wrap { trim: true }),
        card_area,
    );

    // Website list
    let focused = app.focus == FocusPane::Directory;
    let border_color = match (app.directory.status(), focused) {
        (DirectoryStatus::Failed, _) => Color::Red,
        (_, true) => Color::Cyan,
        (_, false) => Color::DarkGray,
    };
    let list_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(app.directory.title());

    let active_index = app.session.selected_website_id.and_then(|id| {
        app.directory
            .websites()
            .iter()
            .position(|site| site.id == Some(id))
            .map(|pos| pos + 1)
    });
    let items: Vec<ListItem> = app
        .directory
        .labels()
        .into_iter()
        .enumerate()
        .map(|(i, label)| {
            let marker = if Some(i) == active_index { "●" } else { " " };
            ListItem::new(format!("{} {} ", marker, label))
        })
        .collect();

    let list = List::new(items)
        .block(list_block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    app.directory_state.select(Some(app.directory.selected_index()));
    frame.render_stateful_widget(list, list_area, &mut app.directory_state);

    let disabled = app.registration_in_flight();
    let title = if disabled {
        " Website URL (registering...) "
    } else {
        " Website URL "
    };
    render_input(
        frame,
        input_area,
        &app.website_input,
        title,
        app.focus == FocusPane::WebsiteInput,
        app.input_mode == InputMode::Editing && !disabled,
        disabled,
    );
}

fn render_input(
    frame: &mut Frame,
    area: Rect,
    input: &InputField,
    title: &str,
    focused: bool,
    editing: bool,
    disabled: bool,
) {
    let border_color = if disabled {
        Color::DarkGray
    } else if focused && editing {
        Color::Yellow
    } else if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title.to_string());

    // Horizontal scrolling keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = input.cursor();
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = input
        .value()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_color = if disabled { Color::DarkGray } else { Color::Cyan };
    let paragraph = Paragraph::new(visible_text)
        .style(Style::default().fg(text_color))
        .block(block);
    frame.render_widget(paragraph, area);

    if focused && editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}
