//! Layout helpers.

use ratatui::prelude::*;

/// Screen frame: body plus the HELP and STATUS bars.
pub struct MainLayout {
    pub body: Rect,
    pub help_bar: Rect,
    pub status_bar: Rect,
}

/// Work form body: fields on the left, product info and notices on the right.
pub struct FormLayout {
    pub fields: Rect,
    pub product_panel: Rect,
    pub notice_panel: Rect,
}

pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(3), // HELP
            Constraint::Length(3), // STATUS
        ])
        .split(area);

    MainLayout {
        body: chunks[0],
        help_bar: chunks[1],
        status_bar: chunks[2],
    }
}

/// Split the body 60/40, the right column into product info over notices.
pub fn create_form_layout(area: Rect) -> FormLayout {
    // Fields get the wider left column.
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    // Product info has a fixed height; notices take the rest.
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(3)])
        .split(columns[1]);

    FormLayout {
        fields: columns[0],
        product_panel: right[0],
        notice_panel: right[1],
    }
}

/// Rect of `width` x `height` centered in `area`, clipped to it.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    // Never larger than the area itself.
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bars_have_fixed_height() {
        let l = create_main_layout(Rect::new(0, 0, 100, 40));
        assert_eq!(l.help_bar.height, 3);
        assert_eq!(l.status_bar.height, 3);
        assert_eq!(l.body.height, 34);
    }

    #[test]
    fn test_centered_is_clipped() {
        let area = Rect::new(0, 0, 20, 10);
        let r = centered(area, 50, 4);
        assert_eq!(r.width, 20);
        assert_eq!(r.y, 3);
    }
}
