use image::DynamicImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    Image(DynamicImage),
}

#[derive(Debug, Clone)]
pub struct PromptMessage {
    pub role: Role,
    pub content: Vec<ContentPart>,
}

impl ContentPart {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Image(_) => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }
}

impl PromptMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: vec![ContentPart::Text(text.into())],
        }
    }

    pub fn user(text: impl Into<String>, image: Option<DynamicImage>) -> Self {
        let mut content = vec![ContentPart::Text(text.into())];
        if let Some(image) = image {
            content.push(ContentPart::Image(image));
        }
        Self {
            role: Role::User,
            content,
        }
    }

    /// Text parts joined with blank lines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn images(&self) -> Vec<DynamicImage> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Image(image) => Some(image.clone()),
                ContentPart::Text(_) => None,
            })
            .collect()
    }
}
