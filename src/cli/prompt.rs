use std::borrow::Cow;
use std::path::Path;

use reedline::{Color, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus};

use super::color::{cyan, green, yellow};

/// kubeconfig のパスからプロンプトに出す短いラベルを作る。
/// 既定の `~/.kube/config` は `config` になる。
fn kubeconfig_label(path: &Path) -> Option<String> {
    path.file_name().map(|s| s.to_string_lossy().to_string())
}

/// 対話モードのプロンプト。
///
/// ```text
/// ⎈ kubectl-ai (config)
/// ❯
/// ```
pub struct KubePrompt {
    label: Option<String>,
}

impl KubePrompt {
    pub fn new(kubeconfig: &Path) -> Self {
        Self {
            label: kubeconfig_label(kubeconfig),
        }
    }
}

impl Prompt for KubePrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        let name = cyan("\u{2388} kubectl-ai");
        match self.label {
            Some(ref cfg) => Cow::Owned(format!("{name} {}\n", yellow(&format!("({cfg})")))),
            None => Cow::Owned(format!("{name}\n")),
        }
    }

    fn get_prompt_color(&self) -> Color {
        Color::White
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Owned(green("\u{276f} "))
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed(" :: ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "(failed) ",
        };
        Cow::Owned(format!("{prefix}(search: '{}') ", history_search.term))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_is_chevron() {
        let prompt = KubePrompt::new(Path::new("/home/me/.kube/config"));
        let rendered = prompt.render_prompt_indicator(PromptEditMode::Default);
        assert!(rendered.contains('\u{276f}'));
    }

    #[test]
    fn left_prompt_shows_kubeconfig_name() {
        let prompt = KubePrompt::new(Path::new("/home/me/.kube/staging.yaml"));
        let left = prompt.render_prompt_left();
        assert!(left.contains("kubectl-ai"));
        assert!(left.contains("staging.yaml"));
    }

    #[test]
    fn label_is_file_name() {
        assert_eq!(kubeconfig_label(Path::new("/root/.kube/config")).as_deref(), Some("config"));
        assert!(kubeconfig_label(Path::new("/")).is_none());
    }
}
