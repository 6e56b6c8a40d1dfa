use dioxus::prelude::*;

/// Design tokens shared by every screen.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Theme {
    pub primary: &'static str,
    pub background: &'static str,
    pub surface: &'static str,
    pub text: &'static str,
    pub muted: &'static str,
    pub danger: &'static str,
    pub radius_px: u32,
    pub font_family: &'static str,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: "#1677ff",
            background: "#0d0f10",
            surface: "#16181a",
            text: "#f5f5f5",
            muted: "#8c8c8c",
            danger: "#ff4d4f",
            radius_px: 8,
            font_family: "'Space Grotesk', sans-serif",
        }
    }
}

impl Theme {
    /// Inline style exposing the tokens as CSS custom properties.
    pub fn css_variables(&self) -> String {
        format!(
            "--color-primary: {}; --color-background: {}; --color-surface: {}; --color-text: {}; --color-muted: {}; --color-danger: {}; --radius: {}px; --font-family: {};",
            self.primary,
            self.background,
            self.surface,
            self.text,
            self.muted,
            self.danger,
            self.radius_px,
            self.font_family,
        )
    }
}

/// User-facing strings and formatting for one language.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Locale {
    pub code: &'static str,
    pub loading: &'static str,
    pub empty: &'static str,
    pub load_more: &'static str,
    pub end_of_list: &'static str,
    pub error_prefix: &'static str,
    pub pause: &'static str,
    pub resume: &'static str,
    pub refresh: &'static str,
}

impl Locale {
    pub const VI_VN: Locale = Locale {
        code: "vi-VN",
        loading: "Đang tải...",
        empty: "Không có dữ liệu",
        load_more: "Tải thêm",
        end_of_list: "Đã hết dữ liệu",
        error_prefix: "Lỗi",
        pause: "Tạm dừng tự động tải",
        resume: "Tiếp tục tự động tải",
        refresh: "Làm mới",
    };

    pub fn format_count(&self, count: usize) -> String {
        let digits = count.to_string();
        let separator = if self.code == "vi-VN" { '.' } else { ',' };
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(separator);
            }
            out.push(c);
        }
        out
    }
}

/// Presentation settings provided to every screen by the app shell.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct UiConfig {
    pub theme: Theme,
    pub locale: Locale,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            locale: Locale::VI_VN,
        }
    }
}

pub fn use_theme() -> Theme {
    use_context::<UiConfig>().theme
}

pub fn use_locale() -> Locale {
    use_context::<UiConfig>().locale
}
