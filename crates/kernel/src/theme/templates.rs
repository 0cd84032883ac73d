//! Built-in templates, used when no template directory is configured or
//! when the directory does not provide a template of the same name.

/// Layout wrapped around every deployed article.
pub const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ page.title }}</title>
</head>
<body>
<main>
<h1>{{ page.title }}</h1>
<article>
{{ page.content | safe }}
</article>
</main>
</body>
</html>
"#;

pub const INDEX: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Pages</title></head>
<body>
<h1>Pages</h1>
<ul>
{% for page in pages %}<li><a href="{{ prefix }}/edit/article/{{ page.id }}">{{ page.title }}</a></li>
{% endfor %}</ul>
<p><a href="{{ prefix }}/new">New page</a></p>
</body>
</html>
"#;

pub const EDIT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Edit {{ page.title }}</title></head>
<body>
<h1>Edit {{ page.title }}</h1>
<form method="post" action="{{ prefix }}/edit/article/{{ page.id }}">
<textarea name="content" rows="30" cols="100">{{ page.content }}</textarea>
<button type="submit">Save</button>
</form>
<p><a href="{{ prefix }}/data/{{ page.id }}">Edit data</a> | <a href="{{ prefix }}/revisions/{{ page.id }}">History</a></p>
</body>
</html>
"#;

pub const DATA: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Data for {{ page.title }}</title></head>
<body>
<h1>Data for {{ page.title }}</h1>
<form method="post" action="{{ prefix }}/data/{{ page.id }}">
<textarea name="data" rows="30" cols="100">{{ data }}</textarea>
<button type="submit">Save</button>
</form>
<p><a href="{{ prefix }}/edit/article/{{ page.id }}">Edit article</a></p>
</body>
</html>
"#;

pub const NEW: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>New page</title></head>
<body>
<h1>New page</h1>
<form method="post" action="{{ prefix }}/new">
<input name="title" placeholder="Title">
<textarea name="content" rows="30" cols="100"></textarea>
<button type="submit">Create</button>
</form>
</body>
</html>
"#;

/// All built-ins as `(name, source)` pairs.
pub const BUILTIN: &[(&str, &str)] = &[
    ("layout.html", LAYOUT),
    ("index.html", INDEX),
    ("edit.html", EDIT),
    ("data.html", DATA),
    ("new.html", NEW),
];
