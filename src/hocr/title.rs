use super::{BBox, Baseline};
use crate::error::{OverlayError, Result};

/// The `title` attribute of an hOCR element, split into `name args...`
/// properties separated by `;`.
#[derive(Debug, Clone, Default)]
pub(crate) struct TitleProps<'a> {
    props: Vec<(&'a str, &'a str)>,
}

impl<'a> TitleProps<'a> {
    pub(crate) fn parse(title: &'a str) -> Self {
        let props = title
            .split(';')
            .filter_map(|raw| {
                let prop = raw.trim();
                if prop.is_empty() {
                    return None;
                }
                let (name, args) = prop.split_once(char::is_whitespace).unwrap_or((prop, ""));
                Some((name, args.trim()))
            })
            .collect();
        TitleProps { props }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&'a str> {
        self.props
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, args)| *args)
    }

    /// `bbox x0 y0 x1 y1` in integer pixels. Absent is `Ok(None)`; present but
    /// malformed is an error. Anything after the fourth value is ignored.
    pub(crate) fn bbox(&self) -> Result<Option<BBox>> {
        let Some(args) = self.get("bbox") else {
            return Ok(None);
        };
        let nums = args
            .split_whitespace()
            .take(4)
            .map(|value| value.parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| OverlayError::layout(format!("bbox is not numeric: '{}'", args)))?;
        let &[x0, y0, x1, y1] = nums.as_slice() else {
            return Err(OverlayError::layout(format!(
                "bbox needs 4 values, found {}: '{}'",
                nums.len(),
                args
            )));
        };
        if x1 < x0 || y1 < y0 {
            return Err(OverlayError::layout(format!("bbox is inverted: '{}'", args)));
        }
        Ok(Some(BBox {
            x0: x0 as f64,
            y0: y0 as f64,
            x1: x1 as f64,
            y1: y1 as f64,
        }))
    }

    /// `baseline slope intercept`. Missing or unparsable data yields `None`.
    pub(crate) fn baseline(&self) -> Option<Baseline> {
        let args = self.get("baseline")?;
        let mut values = args.split_whitespace().map(|value| value.parse::<f64>());
        let slope = values.next()?.ok()?;
        let intercept = values.next()?.ok()?;
        if !slope.is_finite() || !intercept.is_finite() {
            return None;
        }
        Some(Baseline { slope, intercept })
    }
}
