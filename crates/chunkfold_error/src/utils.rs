/// Formats `["a", "b", "c"]` as `"a", "b" and "c"` for user-facing messages.
pub(crate) fn format_quoted_strings(list: &[impl AsRef<str>]) -> String {
  debug_assert!(!list.is_empty());
  let is_single_item = list.len() <= 1;
  let mut quoted_list = list
    .iter()
    .map(|item| format!("\"{}\"", item.as_ref()))
    .collect::<Vec<_>>();
  if is_single_item {
    quoted_list.concat()
  } else {
    let last_item = quoted_list.pop().unwrap();
    format!("{} and {}", quoted_list.join(", "), last_item)
  }
}
