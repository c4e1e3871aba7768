//! Prompt templates for cover art generation and critique.

const COVER_TEMPLATE: &str = "\
Create artwork for a book cover from the description below. \
The artwork must not contain any text or lettering. \
Ignore the book title and the author's name. \
Do not depict specific characters or copyrighted figures, and keep the image within community guidelines. \
Produce only the artwork itself, not a picture of a physical book.

{description}
";

const CRITIQUE_TEMPLATE: &str = "\
You are given an image and the prompt it was generated from. \
Check whether everything the prompt asks for is present in the image. \
If it is, answer with the single word True and nothing else. \
Otherwise answer with a prompt, written like the original one, that describes only the changes the image needs. \
Respect the details of the original prompt and never ask for anything that contradicts it.

Prompt: {prompt}
";

/// Wrap a book description in the cover art instructions
pub fn cover_prompt(description: &str) -> String {
    COVER_TEMPLATE.replace("{description}", description.trim())
}

/// Build the critique instruction for a generated image
pub fn critique_prompt(prompt: &str) -> String {
    CRITIQUE_TEMPLATE.replace("{prompt}", prompt.trim())
}
