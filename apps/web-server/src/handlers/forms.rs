//! Request bodies of the HTML forms and the values templates render them with.

use std::collections::BTreeMap;

use actix_multipart::form::{MultipartForm, bytes::Bytes as FilePart, text::Text};
use actix_web::{Either, web};
use image::ImageFormat;
use serde::Serialize;

use yatube_shared::{FieldMeta, FormErrors, PostForm};

/// One form field as a template sees it.
#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    #[serde(flatten)]
    pub meta: FieldMeta,
    pub value: String,
    pub errors: Vec<String>,
}

/// Pair field metadata with submitted values and errors, keyed by field name.
pub fn bind(
    fields: &[FieldMeta],
    values: &[(&str, &str)],
    errors: &FormErrors,
) -> BTreeMap<&'static str, FieldView> {
    fields
        .iter()
        .map(|meta| {
            let value = values
                .iter()
                .find(|(name, _)| *name == meta.name)
                .map(|(_, value)| value.to_string())
                .unwrap_or_default();
            let view = FieldView {
                meta: *meta,
                value,
                errors: errors.get(meta.name).to_vec(),
            };
            (meta.name, view)
        })
        .collect()
}

/// Multipart variant of the post form.
#[derive(Debug, MultipartForm)]
pub struct PostUpload {
    pub text: Option<Text<String>>,
    pub group: Option<Text<String>>,
    pub image: Option<FilePart>,
}

/// An uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub data: web::Bytes,
}

impl Upload {
    /// Format sniffed from the leading bytes, whatever the file is called.
    pub fn format(&self) -> Option<ImageFormat> {
        image::guess_format(&self.data).ok()
    }

    /// Whether the bytes decode as a supported image.
    pub fn is_image(&self) -> bool {
        self.format()
            .is_some_and(|format| image::load_from_memory_with_format(&self.data, format).is_ok())
    }

    /// Name to store the upload under: the client's stem with the extension
    /// of the detected format. `None` when the format is unknown.
    pub fn stored_name(&self) -> Option<String> {
        let extension = self.format()?.extensions_str().first()?;
        let base = self.file_name.rsplit(['/', '\\']).next().unwrap_or_default();
        let stem = base.rsplit_once('.').map_or(base, |(stem, _)| stem).trim();
        let stem = match stem {
            "" | "." | ".." => "image",
            stem => stem,
        };
        Some(format!("{stem}.{extension}"))
    }
}

/// Post form body, from either a urlencoded or a multipart request.
#[derive(Debug)]
pub struct PostSubmission {
    pub form: PostForm,
    pub image: Option<Upload>,
}

pub type PostBody = Either<web::Form<PostForm>, MultipartForm<PostUpload>>;

impl From<PostBody> for PostSubmission {
    fn from(body: PostBody) -> Self {
        match body {
            Either::Left(form) => Self {
                form: form.into_inner(),
                image: None,
            },
            Either::Right(MultipartForm(upload)) => {
                let image = upload
                    .image
                    .filter(|part| !part.data.is_empty())
                    .map(|part| Upload {
                        file_name: part.file_name.unwrap_or_else(|| "image".to_string()),
                        data: part.data,
                    });
                Self {
                    form: PostForm {
                        text: upload.text.map(Text::into_inner).unwrap_or_default(),
                        group: upload.group.map(Text::into_inner).unwrap_or_default(),
                    },
                    image,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_GIF: &[u8] = b"GIF89a\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\xff\xff\xff!\xf9\x04\x00\x00\x00\x00\x00,\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0c\n\x00;";

    #[test]
    fn test_small_gif_is_an_image() {
        let upload = Upload {
            file_name: "small.gif".to_string(),
            data: web::Bytes::from_static(SMALL_GIF),
        };
        assert!(upload.is_image());
    }

    #[test]
    fn test_stored_name_follows_detected_format() {
        let upload = |file_name: &str| Upload {
            file_name: file_name.to_string(),
            data: web::Bytes::from_static(SMALL_GIF),
        };

        assert_eq!(upload("small.gif").stored_name().as_deref(), Some("small.gif"));
        assert_eq!(upload("x.html").stored_name().as_deref(), Some("x.gif"));
        assert_eq!(upload("photo").stored_name().as_deref(), Some("photo.gif"));
        assert_eq!(upload("../.svg").stored_name().as_deref(), Some("image.gif"));
    }

    #[test]
    fn test_text_file_is_not_an_image() {
        let upload = Upload {
            file_name: "notes.gif".to_string(),
            data: web::Bytes::from_static(b"just some text"),
        };
        assert!(!upload.is_image());
        assert_eq!(upload.stored_name(), None);
    }

    #[test]
    fn test_bind_fills_values_and_errors() {
        let mut errors = FormErrors::default();
        errors.add("text", "Обязательное поле.");

        let fields = bind(&PostForm::FIELDS, &[("group", "3")], &errors);

        assert_eq!(fields["text"].value, "");
        assert_eq!(fields["text"].errors, vec!["Обязательное поле.".to_string()]);
        assert_eq!(fields["group"].value, "3");
        assert!(fields["image"].errors.is_empty());
        assert_eq!(fields["text"].meta.label, "Введите текст");
    }
}
