use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap},
};

use crate::form::FieldKind;
use crate::model::{FieldView, FormView, Model, UIData};
use crate::table::TablePage;

pub const ACTIONS_WIDTH: u16 = 16;
const FORM_WIDTH_PERCENT: u16 = 70;
const FORM_HEIGHT_PERCENT: u16 = 85;
const TEXTAREA_ROWS: usize = 3;

#[derive(Debug, Default)]
pub struct WardUI {
    table_state: TableState,
}

impl WardUI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [tabs_area, toolbar_area, table_area, pagination_area, status_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .areas(frame.area());

        self.render_tabs(uidata, frame, tabs_area);
        match &uidata.table {
            Some(page) => {
                self.render_toolbar(page, frame, toolbar_area);
                self.render_table(page, uidata.selected_row, frame, table_area);
                self.render_pagination(page, frame, pagination_area);
            }
            None => frame.render_widget(
                Paragraph::new("No pages available for this role.").dim(),
                table_area,
            ),
        }
        self.render_statusline(uidata, frame, status_area);

        if let Some(form) = &uidata.form {
            self.render_form(form, frame);
        }
        if let Some(message) = &uidata.confirm_message {
            self.render_confirm(message, frame);
        }
        if uidata.show_popup {
            self.render_popup(&uidata.popup_message, frame);
        }
    }

    fn render_tabs(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let [tabs_area, role_area] =
            Layout::horizontal([Constraint::Fill(1), Constraint::Length(20)]).areas(area);
        let tabs = Tabs::new(uidata.tabs.clone())
            .select(uidata.active_tab)
            .highlight_style(Style::new().bold().reversed())
            .divider("|");
        frame.render_widget(tabs, tabs_area);
        frame.render_widget(
            Paragraph::new(uidata.role.clone())
                .alignment(Alignment::Right)
                .fg(Color::Cyan),
            role_area,
        );
    }

    fn render_toolbar(&self, page: &TablePage, frame: &mut Frame, area: Rect) {
        let text = page.top_content.clone().unwrap_or_default();
        frame.render_widget(Paragraph::new(text).fg(Color::Yellow), area);
    }

    fn render_table(&mut self, page: &TablePage, selected: usize, frame: &mut Frame, area: Rect) {
        let has_actions = page.rows.iter().any(|r| r.actions.is_some());
        let mut widths = vec![Constraint::Fill(1); page.headers.len()];
        if has_actions && let Some(last) = widths.last_mut() {
            *last = Constraint::Length(ACTIONS_WIDTH);
        }

        let header = Row::new(page.headers.iter().map(|h| Cell::from(h.clone())))
            .style(Style::new().bold().underlined());
        let rows = page.rows.iter().map(|row| {
            let mut cells: Vec<Cell> = row.cells.iter().map(|c| Cell::from(c.clone())).collect();
            if let Some(actions) = &row.actions {
                cells.push(Cell::from(actions.clone()).fg(Color::Blue));
            }
            Row::new(cells)
        });

        let table = Table::new(rows, widths)
            .header(header)
            .row_highlight_style(Style::new().reversed())
            .highlight_symbol("> ")
            .block(Block::bordered());

        if page.rows.is_empty() {
            self.table_state.select(None);
        } else {
            self.table_state.select(Some(selected));
        }
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_pagination(&self, page: &TablePage, frame: &mut Frame, area: Rect) {
        let enabled = |on: bool| {
            if on {
                Style::new().bold()
            } else {
                Style::new().add_modifier(Modifier::DIM)
            }
        };

        let mut spans = Vec::new();
        if !page.pages.is_empty() {
            spans.push(Span::styled("‹ Previous ", enabled(page.previous_enabled)));
            for control in page.pages.iter() {
                let label = format!(" {} ", control.number);
                if control.active {
                    spans.push(Span::styled(label, Style::new().reversed().bold()));
                } else {
                    spans.push(Span::raw(label));
                }
            }
            spans.push(Span::styled(" Next ›", enabled(page.next_enabled)));
        }

        let [controls_area, summary_area] =
            Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1)]).areas(area);
        frame.render_widget(Paragraph::new(Line::from(spans)), controls_area);
        frame.render_widget(
            Paragraph::new(page.summary.clone()).alignment(Alignment::Right),
            summary_area,
        );
    }

    fn render_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        match &uidata.cmdinput {
            Some(input) => {
                let line = Line::from(vec![Span::raw("/").bold(), Span::raw(input.input.clone())]);
                frame.render_widget(Paragraph::new(line), area);
                frame.set_cursor_position((area.x + 1 + input.cursor_pos as u16, area.y));
            }
            None => {
                frame.render_widget(
                    Paragraph::new(uidata.status_message.clone()).italic(),
                    area,
                );
            }
        }
    }

    fn render_form(&self, form: &FormView, frame: &mut Frame) {
        let area = centered(frame.area(), FORM_WIDTH_PERCENT, FORM_HEIGHT_PERCENT);
        let block = Block::bordered()
            .title(Line::from(format!(" {} ", form.title)).bold().centered())
            .title(Line::from(format!(" {} ", form.mode)).dim().right_aligned())
            .title_bottom(
                Line::from(" Tab next  Space toggle  ←/→ choose  Ctrl+S save  Esc cancel ")
                    .centered(),
            );
        let inner = block.inner(area);

        let label_width = form
            .fields
            .iter()
            .map(|f| f.label.chars().count() + 1)
            .max()
            .unwrap_or(0)
            + 2;

        let value_width = (inner.width as usize).saturating_sub(label_width).max(1);

        let mut lines: Vec<Line> = Vec::new();
        let mut cursor = None;
        let mut focus_line = 0;
        for field in form.fields.iter() {
            if field.focused {
                focus_line = lines.len();
                if let Some(input) = &field.input {
                    let (row, col) = if field.kind == FieldKind::Textarea {
                        (
                            (input.cursor_pos / value_width).min(TEXTAREA_ROWS - 1),
                            input.cursor_pos % value_width,
                        )
                    } else {
                        (0, input.cursor_pos)
                    };
                    cursor = Some((label_width + col, lines.len() + row));
                }
            }
            if field.kind == FieldKind::Textarea {
                lines.extend(textarea_lines(field, label_width, value_width));
            } else {
                lines.push(field_line(field, label_width));
            }
            if let Some(preview) = &field.preview {
                lines.push(Line::from(format!("{:label_width$}{preview}", "")).dim());
            }
        }
        lines.push(Line::default());
        if form.save_focused {
            focus_line = lines.len();
        }
        let save_style = if form.save_focused {
            Style::new().reversed().bold()
        } else {
            Style::new().bold()
        };
        lines.push(Line::from(Span::styled("[ Save ]", save_style)).centered());
        for problem in form.problems.iter() {
            lines.push(Line::from(problem.clone()).fg(Color::Red));
        }

        let scroll = focus_line.saturating_sub(inner.height.saturating_sub(1) as usize) as u16;
        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(lines).block(block).scroll((scroll, 0)), area);

        if let Some((x, y)) = cursor {
            let y = y as u16;
            if y >= scroll && y - scroll < inner.height {
                let x = (inner.x + x as u16).min(inner.right().saturating_sub(1));
                frame.set_cursor_position((x, inner.y + y - scroll));
            }
        }
    }

    fn render_confirm(&self, message: &str, frame: &mut Frame) {
        let area = centered(frame.area(), 50, 20);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(message.to_string())
                .wrap(Wrap { trim: true })
                .alignment(Alignment::Center)
                .block(Block::bordered().title(" Confirm ").fg(Color::Red)),
            area,
        );
    }

    fn render_popup(&self, message: &str, frame: &mut Frame) {
        let area = centered(frame.area(), 60, 80);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(message.to_string()).block(Block::bordered().title(" Help ")),
            area,
        );
    }
}

fn field_line(field: &FieldView, label_width: usize) -> Line<'static> {
    let marker = if field.required { "*" } else { "" };
    let label = format!("{}{marker}", field.label);
    let mut label_style = Style::new();
    if field.focused {
        label_style = label_style.bold().fg(Color::Yellow);
    }
    let mut spans = vec![Span::styled(format!("{label:label_width$}"), label_style)];

    let value_style = if field.disabled {
        Style::new().add_modifier(Modifier::DIM)
    } else if field.focused {
        Style::new().underlined()
    } else {
        Style::new()
    };

    match field.kind {
        FieldKind::CheckboxGroup => {
            for (idx, (label, on)) in field.options.iter().enumerate() {
                let text = format!("[{}] {label}", if *on { "x" } else { " " });
                let style = if field.option_focus == Some(idx) {
                    value_style.reversed()
                } else {
                    value_style
                };
                spans.push(Span::styled(text, style));
                spans.push(Span::raw("  "));
            }
        }
        FieldKind::Select => {
            spans.push(Span::styled(format!("‹ {} ›", field.value), value_style));
        }
        _ => {
            let text = match &field.input {
                Some(input) => input.input.clone(),
                None => field.value.clone(),
            };
            spans.push(Span::styled(text, value_style));
            if field.kind == FieldKind::File && field.input.is_some() && !field.value.is_empty() {
                spans.push(Span::raw(format!("  ({})", field.value)).dim());
            }
        }
    }
    if field.disabled {
        spans.push(Span::raw("  (locked)").dim());
    }
    Line::from(spans)
}

fn textarea_lines(field: &FieldView, label_width: usize, value_width: usize) -> Vec<Line<'static>> {
    let text = match &field.input {
        Some(input) => input.input.clone(),
        None => field.value.clone(),
    };
    let chars: Vec<char> = text.chars().collect();
    let style = if field.disabled {
        Style::new().add_modifier(Modifier::DIM)
    } else {
        Style::new().bg(Color::DarkGray)
    };
    let mut label_style = Style::new();
    if field.focused {
        label_style = label_style.bold().fg(Color::Yellow);
    }
    let marker = if field.required { "*" } else { "" };

    (0..TEXTAREA_ROWS)
        .map(|row| {
            let chunk: String = chars
                .iter()
                .skip(row * value_width)
                .take(value_width)
                .collect();
            let label = if row == 0 {
                format!("{}{marker}", field.label)
            } else {
                String::new()
            };
            Line::from(vec![
                Span::styled(format!("{label:label_width$}"), label_style),
                Span::styled(format!("{chunk:value_width$}"), style),
            ])
        })
        .collect()
}

fn centered(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(height_percent)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(width_percent)])
        .flex(Flex::Center)
        .areas(area);
    area
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, WardConfig};
    use crate::page::tests::medication_page;
    use crate::page::{Access, AnyPage};
    use ratatui::{Terminal, backend::TestBackend};

    fn render(model: &Model) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let mut ui = WardUI::new();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect()
    }

    fn model() -> Model {
        let page: Box<dyn AnyPage> = Box::new(medication_page(7, Access::FULL));
        Model::with_pages(&WardConfig::default(), vec![page])
    }

    fn contains(lines: &[String], text: &str) -> bool {
        lines.iter().any(|l| l.contains(text))
    }

    #[test]
    fn table_screen() {
        let lines = render(&model());
        assert!(lines[0].contains("Medications"));
        assert!(lines[0].contains("Administrator"));
        assert!(contains(&lines, "Drug 01"));
        assert!(contains(&lines, "Drug 05"));
        assert!(!contains(&lines, "Drug 06"));
        assert!(contains(&lines, "edit · delete"));
        assert!(contains(&lines, "Showing 1 to 5 of 7 results"));
        assert!(contains(&lines, "‹ Previous"));
        assert!(contains(&lines, "Next ›"));
    }

    #[test]
    fn form_modal() {
        let mut model = model();
        model.update(Some(Message::Create)).unwrap();
        let lines = render(&model);
        assert!(contains(&lines, "New medication"));
        assert!(contains(&lines, " create "));
        assert!(contains(&lines, "Name*"));
        assert!(contains(&lines, "[ ] morning"));
        assert!(contains(&lines, "[ Save ]"));
        let instructions = lines.iter().position(|l| l.contains("Instructions")).unwrap();
        assert!(lines[instructions + 4].contains("[ Save ]"));
    }

    #[test]
    fn help_popup() {
        let mut model = model();
        model.update(Some(Message::Help)).unwrap();
        let lines = render(&model);
        assert!(contains(&lines, "Help"));
        assert!(contains(&lines, "copy selected row"));
    }
}
