//! Top header: current page, agent address, last update and key hints.

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders},
};

use crate::poller::PollState;
use crate::ui::theme::ERROR;

pub fn draw_header(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    section_key: &str,
    endpoint: &str,
    st: &PollState,
) {
    let status = match (&st.error, st.updated_at) {
        (Some(e), _) => format!("error: {e}"),
        (None, Some(t)) => format!("updated {}", t.format("%H:%M:%S")),
        (None, None) => "connecting...".into(),
    };
    let title = format!("monitorz [{section_key}] | {endpoint} | {status}  (Tab: switch page, q: quit)");
    let mut block = Block::default().title(title).borders(Borders::BOTTOM);
    if st.error.is_some() {
        block = block.title_style(Style::default().fg(ERROR));
    }
    f.render_widget(block, area);
}
